use cff::{
    cff::{
        Charset, DictValue, Encoding, PredefinedCharset, PredefinedEncoding, CffHeader,
    },
    CffCompiler, CffParser,
};

/// The example font from the appendix of Technical Note #5176
const TIMES_ROMAN: &str = concat!(
    "0100040100010101134142434445462b54696d65732d526f6d616e000101011ff81b00f81c",
    "02f81d03f819041c6f000dfb3cfb6efa7cfa1605e911b8f112000301010813183030312e30",
    "303754696d657320526f6d616e54696d657300000002010102030e0e7d99f92a99fb7695f7",
    "738b06f79a93fc7c8c077d99f85695f75e9908fb6e8cf87393f7108b09a70adf0bf78e14",
);

fn font_bytes() -> Vec<u8> {
    (0..TIMES_ROMAN.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&TIMES_ROMAN[i..i + 2], 16).unwrap())
        .collect()
}

#[test]
fn parses_example_font() {
    let data = font_bytes();
    assert_eq!(data.len(), 147);

    let font = CffParser::new(&data).parse().unwrap();

    assert_eq!(
        font.header,
        CffHeader {
            major: 1,
            minor: 0,
            header_size: 4,
            off_size: 1,
        }
    );
    assert_eq!(font.names, vec!["ABCDEF+Times-Roman".to_owned()]);

    assert_eq!(font.strings.get(0), Some(".notdef"));
    assert_eq!(font.strings.get(391), Some("001.007"));
    assert_eq!(font.strings.get(392), Some("Times Roman"));
    assert_eq!(font.strings.get(393), Some("Times"));
    assert_eq!(font.strings.get(394), None);

    let top = &font.top_dict.dict;
    assert_eq!(top.get("version"), Some(&DictValue::Sid(391)));
    assert_eq!(top.get("FullName"), Some(&DictValue::Sid(392)));
    assert_eq!(top.get("FamilyName"), Some(&DictValue::Sid(393)));
    assert_eq!(top.get("Weight"), Some(&DictValue::Sid(389)));
    assert_eq!(top.number("UniqueID"), Some(28416.0));
    assert_eq!(font.top_dict.font_bbox(), vec![-168.0, -218.0, 1000.0, 898.0]);
    assert_eq!(top.offset("CharStrings"), Some(94));
    assert_eq!(
        top.get("Private"),
        Some(&DictValue::SizeOffset {
            size: 45,
            offset: 102
        })
    );

    assert!(!font.is_cid());
    assert_eq!(font.num_glyphs(), 2);
    assert_eq!(font.char_strings.get(0), Some(&[0x0e][..]));
    assert_eq!(font.char_strings.get(1), Some(&[0x0e][..]));
    assert!(font.global_subrs.is_empty());

    assert_eq!(font.top_dict.private.default_width_x(), 250.0);
    assert_eq!(font.widths, vec![250.0, 250.0]);
    assert!(font.seacs.is_empty());

    assert_eq!(font.charset, Charset::Predefined(PredefinedCharset::IsoAdobe));
    assert_eq!(
        font.encoding,
        Some(Encoding::Predefined(PredefinedEncoding::Standard))
    );
}

#[test]
fn example_font_survives_recompiling() {
    let data = font_bytes();
    let font = CffParser::new(&data).parse().unwrap();

    let compiled = CffCompiler::new(&font).compile().unwrap();
    assert_eq!(compiled.last(), Some(&0));

    let reparsed = CffParser::new(&compiled).parse().unwrap();

    assert_eq!(reparsed.names, font.names);
    assert_eq!(reparsed.strings, font.strings);
    assert_eq!(reparsed.char_strings, font.char_strings);
    assert_eq!(reparsed.widths, font.widths);
    assert_eq!(reparsed.charset, font.charset);
    assert_eq!(reparsed.encoding, font.encoding);

    for key in ["version", "FullName", "FamilyName", "Weight", "UniqueID", "FontBBox"] {
        assert_eq!(reparsed.top_dict.dict.get(key), font.top_dict.dict.get(key), "{}", key);
    }

    assert!(reparsed
        .top_dict
        .private
        .dict
        .entries()
        .eq(font.top_dict.private.dict.entries()));

    // a second pass writes the same bytes
    assert_eq!(CffCompiler::new(&reparsed).compile().unwrap(), compiled);
}

#[test]
fn truncated_font_is_an_error() {
    let data = font_bytes();

    assert!(CffParser::new(&data[..40]).parse().is_err());
}
