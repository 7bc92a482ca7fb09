//! binary annotation tool
//!
//! Takes a base font, an annotation font and a mapping from characters to
//! annotation strings, and writes a font whose mapped characters carry their
//! annotations, with `liga` rules to switch between variants. The font is
//! written both as TrueType and as WOFF.

use std::path::{Path, PathBuf};

use clap::Parser;
use wingfont::{
    annotate_font, woff, AnnotationMapping, FamilyNames, Options, WingError, WorkingFont,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The base font file.
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// The font the annotations are drawn with.
    #[arg(short, long)]
    anno: PathBuf,

    /// Mapping file, one `char,annotation` record per line
    #[arg(short, long)]
    mapping: PathBuf,

    /// Output path, without the `.ttf` / `.woff` extension
    #[arg(short, long)]
    output: PathBuf,

    /// Scale of the base glyphs
    #[arg(long, default_value_t = 0.60)]
    base_scale: f64,

    /// Scale of the annotation glyphs
    #[arg(long, default_value_t = 0.35)]
    anno_scale: f64,

    /// Vertical offset of the base glyphs, as a fraction of the em
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    base_y_offset: f64,

    /// Vertical offset of the annotations, as a fraction of the em
    #[arg(long, default_value_t = 0.70, allow_negative_numbers = true)]
    anno_y_offset: f64,

    /// Rotation of the base glyphs in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    base_rotate: f64,

    /// Rotation of the annotations in degrees
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    anno_rotate: f64,

    /// Minimum left side bearing of rewritten glyphs
    #[arg(long, allow_negative_numbers = true)]
    min_lsb: Option<f64>,

    /// Swap the vertical placement of base glyphs and annotations
    #[arg(long)]
    invert: bool,

    /// Compress annotations that are wider than the glyph
    #[arg(long)]
    fit: bool,

    /// Fraction of the advance kept clear by --fit and --auto-width
    #[arg(long, default_value_t = 0.03)]
    fit_padding: f64,

    /// Spacing between annotation characters, as a fraction of the em
    #[arg(long, default_value_t = -0.03, allow_negative_numbers = true)]
    anno_spacing: f64,

    /// Widen glyphs whose annotation doesn't fit
    #[arg(long)]
    auto_width: bool,

    /// Recompute the vertical font metrics from the drawn glyphs
    #[arg(long)]
    auto_height: bool,

    /// Padding above the ink for --auto-height, as a fraction of the em
    #[arg(long, allow_negative_numbers = true)]
    top_padding: Option<f64>,

    /// Padding below the ink for --auto-height, as a fraction of the em
    #[arg(long, allow_negative_numbers = true)]
    bottom_padding: Option<f64>,

    /// New English family name
    #[arg(short = 'f', long)]
    family: Option<String>,

    /// New Simplified Chinese (PRC) family name
    #[arg(long = "fcn")]
    family_cn: Option<String>,

    /// New Traditional Chinese (Taiwan) family name
    #[arg(long = "ftw")]
    family_tw: Option<String>,

    /// New Traditional Chinese (Hong Kong) family name
    #[arg(long = "fhk")]
    family_hk: Option<String>,
}

impl Args {
    fn options(&self) -> Options {
        Options {
            base_scale: self.base_scale,
            anno_scale: self.anno_scale,
            base_y_offset: self.base_y_offset,
            anno_y_offset: self.anno_y_offset,
            base_rotate: self.base_rotate,
            anno_rotate: self.anno_rotate,
            min_lsb: self.min_lsb,
            invert: self.invert,
            fit: self.fit,
            fit_padding: self.fit_padding,
            anno_spacing: self.anno_spacing,
            auto_width: self.auto_width,
            auto_height: self.auto_height,
            top_padding: self.top_padding,
            bottom_padding: self.bottom_padding,
            family_names: FamilyNames {
                english: self.family.clone(),
                simplified_chinese: self.family_cn.clone(),
                taiwan: self.family_tw.clone(),
                hong_kong: self.family_hk.clone(),
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error("Failed to read '{}': {source}", path.display())]
    Input {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write '{}': {source}", path.display())]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Font(#[from] WingError),
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), RunError> {
    let base = WorkingFont::from_bytes(&read(&args.input)?)?;
    let anno = WorkingFont::from_bytes(&read(&args.anno)?)?;
    let mapping_bytes = read(&args.mapping)?;
    let mapping = AnnotationMapping::from_text(&String::from_utf8_lossy(&mapping_bytes))?;

    let annotated = annotate_font(&base, &anno, &mapping, &args.options())?;
    let ttf = annotated.font.to_bytes()?;
    let woff_bytes = woff::to_woff(&ttf)?;
    write(&args.output, "ttf", &ttf)?;
    write(&args.output, "woff", &woff_bytes)?;
    Ok(())
}

fn write(prefix: &Path, extension: &str, data: &[u8]) -> Result<(), RunError> {
    let mut path = prefix.as_os_str().to_owned();
    path.push(".");
    path.push(extension);
    let path = PathBuf::from(path);
    std::fs::write(&path, data).map_err(|source| RunError::Output {
        path: path.clone(),
        source,
    })?;
    log::info!("wrote {}", path.display());
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>, RunError> {
    std::fs::read(path).map_err(|source| RunError::Input {
        path: path.to_owned(),
        source,
    })
}
