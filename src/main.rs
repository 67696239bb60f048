use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;

use cff::{
    cff::{Charset, DictValue, Encoding},
    CffCompiler, CffFont, CffParser, ParseOptions,
};

/// Dump the structure of a CFF font, optionally writing it back out
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The input CFF file.
    path: PathBuf,

    /// Keep four-operand `endchar` programs instead of recording them as seac
    #[arg(long)]
    no_seac: bool,

    /// Recompile the font into this file
    #[arg(long, value_name = "OUT")]
    compile: Option<PathBuf>,
}

fn format_value(value: &DictValue, font: &CffFont) -> String {
    match value {
        DictValue::Sid(sid) => format!("{:?} (SID {})", font.strings.resolve(*sid), sid),
        DictValue::Ros {
            registry,
            ordering,
            supplement,
        } => format!(
            "{}-{}-{}",
            font.strings.resolve(*registry),
            font.strings.resolve(*ordering),
            supplement
        ),
        DictValue::SizeOffset { size, offset } => format!("{} bytes at {}", size, offset),
        value => format!("{:?}", value.to_numbers()),
    }
}

fn dump(font: &CffFont) {
    let header = font.header;
    println!(
        "CFF {}.{}, header size {}, offset size {}",
        header.major, header.minor, header.header_size, header.off_size
    );

    for name in &font.names {
        println!("name: {}", name);
    }

    println!("Top DICT:");
    for (entry, value) in font.top_dict.dict.entries() {
        println!("  {}: {}", entry.name, format_value(value, font));
    }

    println!("glyphs: {}", font.num_glyphs());
    println!("custom strings: {}", font.strings.custom().len());
    println!("global subrs: {}", font.global_subrs.count());

    match &font.charset {
        Charset::Predefined(predefined) => println!("charset: predefined {:?}", predefined),
        Charset::Custom { format, glyphs } => {
            println!("charset: format {}, {} entries", format, glyphs.len())
        }
    }

    match &font.encoding {
        Some(Encoding::Predefined(predefined)) => {
            println!("encoding: predefined {:?}", predefined)
        }
        Some(Encoding::Custom(custom)) => println!(
            "encoding: format {}, {} codes, {} supplements",
            custom.format(),
            custom.map().len(),
            custom.supplements().len()
        ),
        None => println!("encoding: none"),
    }

    if let Some(fd_select) = &font.fd_select {
        println!(
            "FDSelect: format {}, {} glyphs, {} Font DICTs",
            fd_select.format,
            fd_select.len(),
            font.fd_array.len()
        );
    }

    for (gid, seac) in &font.seacs {
        println!(
            "seac: glyph {} = base {} + accent {} at ({}, {})",
            gid,
            seac.base_code(),
            seac.accent_code(),
            seac.adx,
            seac.ady
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    let data =
        fs::read(&args.path).with_context(|| format!("failed to read {}", args.path.display()))?;

    let font = CffParser::with_options(
        &data,
        ParseOptions {
            seac_analysis: !args.no_seac,
        },
    )
    .parse()?;

    dump(&font);

    if let Some(out) = &args.compile {
        let compiled = CffCompiler::new(&font).compile()?;
        fs::write(out, &compiled).with_context(|| format!("failed to write {}", out.display()))?;
        println!("wrote {} bytes to {}", compiled.len(), out.display());
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags() {
        let args = Args::try_parse_from(["cffdump", "font.cff"]).unwrap();
        assert_eq!(args.path, PathBuf::from("font.cff"));
        assert!(!args.no_seac);
        assert_eq!(args.compile, None);

        let args =
            Args::try_parse_from(["cffdump", "font.cff", "--no-seac", "--compile", "out.cff"])
                .unwrap();
        assert!(args.no_seac);
        assert_eq!(args.compile, Some(PathBuf::from("out.cff")));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Args::try_parse_from(["cffdump"]).is_err());
        assert!(Args::try_parse_from(["cffdump", "font.cff", "--compile"]).is_err());
        assert!(Args::try_parse_from(["cffdump", "font.cff", "--bogus"]).is_err());
    }
}
