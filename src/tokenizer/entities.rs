use lazy_static::lazy_static;
use phf::phf_map;

/// Named character references. Keys that end in `;` only resolve when the
/// reference was terminated by a semicolon; keys without one are the legacy
/// references that may also resolve bare (longest-prefix match).
pub static ENTITIES: phf::Map<&'static str, &'static str> = phf_map! {
    // Legacy references, resolvable with and without the semicolon
    "AElig" => "\u{C6}", "AElig;" => "\u{C6}",
    "AMP" => "&", "AMP;" => "&",
    "Aacute" => "\u{C1}", "Aacute;" => "\u{C1}",
    "Acirc" => "\u{C2}", "Acirc;" => "\u{C2}",
    "Agrave" => "\u{C0}", "Agrave;" => "\u{C0}",
    "Aring" => "\u{C5}", "Aring;" => "\u{C5}",
    "Atilde" => "\u{C3}", "Atilde;" => "\u{C3}",
    "Auml" => "\u{C4}", "Auml;" => "\u{C4}",
    "COPY" => "\u{A9}", "COPY;" => "\u{A9}",
    "Ccedil" => "\u{C7}", "Ccedil;" => "\u{C7}",
    "ETH" => "\u{D0}", "ETH;" => "\u{D0}",
    "Eacute" => "\u{C9}", "Eacute;" => "\u{C9}",
    "Ecirc" => "\u{CA}", "Ecirc;" => "\u{CA}",
    "Egrave" => "\u{C8}", "Egrave;" => "\u{C8}",
    "Euml" => "\u{CB}", "Euml;" => "\u{CB}",
    "GT" => ">", "GT;" => ">",
    "Iacute" => "\u{CD}", "Iacute;" => "\u{CD}",
    "Icirc" => "\u{CE}", "Icirc;" => "\u{CE}",
    "Igrave" => "\u{CC}", "Igrave;" => "\u{CC}",
    "Iuml" => "\u{CF}", "Iuml;" => "\u{CF}",
    "LT" => "<", "LT;" => "<",
    "Ntilde" => "\u{D1}", "Ntilde;" => "\u{D1}",
    "Oacute" => "\u{D3}", "Oacute;" => "\u{D3}",
    "Ocirc" => "\u{D4}", "Ocirc;" => "\u{D4}",
    "Ograve" => "\u{D2}", "Ograve;" => "\u{D2}",
    "Oslash" => "\u{D8}", "Oslash;" => "\u{D8}",
    "Otilde" => "\u{D5}", "Otilde;" => "\u{D5}",
    "Ouml" => "\u{D6}", "Ouml;" => "\u{D6}",
    "QUOT" => "\"", "QUOT;" => "\"",
    "REG" => "\u{AE}", "REG;" => "\u{AE}",
    "THORN" => "\u{DE}", "THORN;" => "\u{DE}",
    "Uacute" => "\u{DA}", "Uacute;" => "\u{DA}",
    "Ucirc" => "\u{DB}", "Ucirc;" => "\u{DB}",
    "Ugrave" => "\u{D9}", "Ugrave;" => "\u{D9}",
    "Uuml" => "\u{DC}", "Uuml;" => "\u{DC}",
    "Yacute" => "\u{DD}", "Yacute;" => "\u{DD}",
    "aacute" => "\u{E1}", "aacute;" => "\u{E1}",
    "acirc" => "\u{E2}", "acirc;" => "\u{E2}",
    "acute" => "\u{B4}", "acute;" => "\u{B4}",
    "aelig" => "\u{E6}", "aelig;" => "\u{E6}",
    "agrave" => "\u{E0}", "agrave;" => "\u{E0}",
    "amp" => "&", "amp;" => "&",
    "aring" => "\u{E5}", "aring;" => "\u{E5}",
    "atilde" => "\u{E3}", "atilde;" => "\u{E3}",
    "auml" => "\u{E4}", "auml;" => "\u{E4}",
    "brvbar" => "\u{A6}", "brvbar;" => "\u{A6}",
    "ccedil" => "\u{E7}", "ccedil;" => "\u{E7}",
    "cedil" => "\u{B8}", "cedil;" => "\u{B8}",
    "cent" => "\u{A2}", "cent;" => "\u{A2}",
    "copy" => "\u{A9}", "copy;" => "\u{A9}",
    "curren" => "\u{A4}", "curren;" => "\u{A4}",
    "deg" => "\u{B0}", "deg;" => "\u{B0}",
    "divide" => "\u{F7}", "divide;" => "\u{F7}",
    "eacute" => "\u{E9}", "eacute;" => "\u{E9}",
    "ecirc" => "\u{EA}", "ecirc;" => "\u{EA}",
    "egrave" => "\u{E8}", "egrave;" => "\u{E8}",
    "eth" => "\u{F0}", "eth;" => "\u{F0}",
    "euml" => "\u{EB}", "euml;" => "\u{EB}",
    "frac12" => "\u{BD}", "frac12;" => "\u{BD}",
    "frac14" => "\u{BC}", "frac14;" => "\u{BC}",
    "frac34" => "\u{BE}", "frac34;" => "\u{BE}",
    "gt" => ">", "gt;" => ">",
    "iacute" => "\u{ED}", "iacute;" => "\u{ED}",
    "icirc" => "\u{EE}", "icirc;" => "\u{EE}",
    "iexcl" => "\u{A1}", "iexcl;" => "\u{A1}",
    "igrave" => "\u{EC}", "igrave;" => "\u{EC}",
    "iquest" => "\u{BF}", "iquest;" => "\u{BF}",
    "iuml" => "\u{EF}", "iuml;" => "\u{EF}",
    "laquo" => "\u{AB}", "laquo;" => "\u{AB}",
    "lt" => "<", "lt;" => "<",
    "macr" => "\u{AF}", "macr;" => "\u{AF}",
    "micro" => "\u{B5}", "micro;" => "\u{B5}",
    "middot" => "\u{B7}", "middot;" => "\u{B7}",
    "nbsp" => "\u{A0}", "nbsp;" => "\u{A0}",
    "not" => "\u{AC}", "not;" => "\u{AC}",
    "ntilde" => "\u{F1}", "ntilde;" => "\u{F1}",
    "oacute" => "\u{F3}", "oacute;" => "\u{F3}",
    "ocirc" => "\u{F4}", "ocirc;" => "\u{F4}",
    "ograve" => "\u{F2}", "ograve;" => "\u{F2}",
    "ordf" => "\u{AA}", "ordf;" => "\u{AA}",
    "ordm" => "\u{BA}", "ordm;" => "\u{BA}",
    "oslash" => "\u{F8}", "oslash;" => "\u{F8}",
    "otilde" => "\u{F5}", "otilde;" => "\u{F5}",
    "ouml" => "\u{F6}", "ouml;" => "\u{F6}",
    "para" => "\u{B6}", "para;" => "\u{B6}",
    "plusmn" => "\u{B1}", "plusmn;" => "\u{B1}",
    "pound" => "\u{A3}", "pound;" => "\u{A3}",
    "quot" => "\"", "quot;" => "\"",
    "raquo" => "\u{BB}", "raquo;" => "\u{BB}",
    "reg" => "\u{AE}", "reg;" => "\u{AE}",
    "sect" => "\u{A7}", "sect;" => "\u{A7}",
    "shy" => "\u{AD}", "shy;" => "\u{AD}",
    "sup1" => "\u{B9}", "sup1;" => "\u{B9}",
    "sup2" => "\u{B2}", "sup2;" => "\u{B2}",
    "sup3" => "\u{B3}", "sup3;" => "\u{B3}",
    "szlig" => "\u{DF}", "szlig;" => "\u{DF}",
    "thorn" => "\u{FE}", "thorn;" => "\u{FE}",
    "times" => "\u{D7}", "times;" => "\u{D7}",
    "uacute" => "\u{FA}", "uacute;" => "\u{FA}",
    "ucirc" => "\u{FB}", "ucirc;" => "\u{FB}",
    "ugrave" => "\u{F9}", "ugrave;" => "\u{F9}",
    "uml" => "\u{A8}", "uml;" => "\u{A8}",
    "uuml" => "\u{FC}", "uuml;" => "\u{FC}",
    "yacute" => "\u{FD}", "yacute;" => "\u{FD}",
    "yen" => "\u{A5}", "yen;" => "\u{A5}",
    "yuml" => "\u{FF}", "yuml;" => "\u{FF}",

    // Semicolon-only references
    "OElig;" => "\u{152}",
    "oelig;" => "\u{153}",
    "Scaron;" => "\u{160}",
    "scaron;" => "\u{161}",
    "Yuml;" => "\u{178}",
    "fnof;" => "\u{192}",
    "circ;" => "\u{2C6}",
    "tilde;" => "\u{2DC}",
    "apos;" => "'",
    "ensp;" => "\u{2002}",
    "emsp;" => "\u{2003}",
    "thinsp;" => "\u{2009}",
    "zwnj;" => "\u{200C}",
    "zwj;" => "\u{200D}",
    "lrm;" => "\u{200E}",
    "rlm;" => "\u{200F}",
    "ndash;" => "\u{2013}",
    "mdash;" => "\u{2014}",
    "lsquo;" => "\u{2018}",
    "rsquo;" => "\u{2019}",
    "sbquo;" => "\u{201A}",
    "ldquo;" => "\u{201C}",
    "rdquo;" => "\u{201D}",
    "bdquo;" => "\u{201E}",
    "dagger;" => "\u{2020}",
    "Dagger;" => "\u{2021}",
    "bull;" => "\u{2022}",
    "hellip;" => "\u{2026}",
    "permil;" => "\u{2030}",
    "prime;" => "\u{2032}",
    "Prime;" => "\u{2033}",
    "lsaquo;" => "\u{2039}",
    "rsaquo;" => "\u{203A}",
    "oline;" => "\u{203E}",
    "frasl;" => "\u{2044}",
    "euro;" => "\u{20AC}",
    "trade;" => "\u{2122}",
    "larr;" => "\u{2190}",
    "uarr;" => "\u{2191}",
    "rarr;" => "\u{2192}",
    "darr;" => "\u{2193}",
    "harr;" => "\u{2194}",
    "crarr;" => "\u{21B5}",
    "lArr;" => "\u{21D0}",
    "uArr;" => "\u{21D1}",
    "rArr;" => "\u{21D2}",
    "dArr;" => "\u{21D3}",
    "hArr;" => "\u{21D4}",
    "forall;" => "\u{2200}",
    "part;" => "\u{2202}",
    "exist;" => "\u{2203}",
    "empty;" => "\u{2205}",
    "nabla;" => "\u{2207}",
    "isin;" => "\u{2208}",
    "notin;" => "\u{2209}",
    "ni;" => "\u{220B}",
    "prod;" => "\u{220F}",
    "sum;" => "\u{2211}",
    "minus;" => "\u{2212}",
    "lowast;" => "\u{2217}",
    "radic;" => "\u{221A}",
    "prop;" => "\u{221D}",
    "infin;" => "\u{221E}",
    "ang;" => "\u{2220}",
    "and;" => "\u{2227}",
    "or;" => "\u{2228}",
    "cap;" => "\u{2229}",
    "cup;" => "\u{222A}",
    "int;" => "\u{222B}",
    "there4;" => "\u{2234}",
    "sim;" => "\u{223C}",
    "cong;" => "\u{2245}",
    "asymp;" => "\u{2248}",
    "ne;" => "\u{2260}",
    "equiv;" => "\u{2261}",
    "le;" => "\u{2264}",
    "ge;" => "\u{2265}",
    "sub;" => "\u{2282}",
    "sup;" => "\u{2283}",
    "nsub;" => "\u{2284}",
    "sube;" => "\u{2286}",
    "supe;" => "\u{2287}",
    "oplus;" => "\u{2295}",
    "otimes;" => "\u{2297}",
    "perp;" => "\u{22A5}",
    "sdot;" => "\u{22C5}",
    "lceil;" => "\u{2308}",
    "rceil;" => "\u{2309}",
    "lfloor;" => "\u{230A}",
    "rfloor;" => "\u{230B}",
    "lang;" => "\u{27E8}",
    "rang;" => "\u{27E9}",
    "loz;" => "\u{25CA}",
    "spades;" => "\u{2660}",
    "clubs;" => "\u{2663}",
    "hearts;" => "\u{2665}",
    "diams;" => "\u{2666}",
    "Alpha;" => "\u{391}",
    "Beta;" => "\u{392}",
    "Gamma;" => "\u{393}",
    "Delta;" => "\u{394}",
    "Epsilon;" => "\u{395}",
    "Zeta;" => "\u{396}",
    "Eta;" => "\u{397}",
    "Theta;" => "\u{398}",
    "Iota;" => "\u{399}",
    "Kappa;" => "\u{39A}",
    "Lambda;" => "\u{39B}",
    "Mu;" => "\u{39C}",
    "Nu;" => "\u{39D}",
    "Xi;" => "\u{39E}",
    "Omicron;" => "\u{39F}",
    "Pi;" => "\u{3A0}",
    "Rho;" => "\u{3A1}",
    "Sigma;" => "\u{3A3}",
    "Tau;" => "\u{3A4}",
    "Upsilon;" => "\u{3A5}",
    "Phi;" => "\u{3A6}",
    "Chi;" => "\u{3A7}",
    "Psi;" => "\u{3A8}",
    "Omega;" => "\u{3A9}",
    "alpha;" => "\u{3B1}",
    "beta;" => "\u{3B2}",
    "gamma;" => "\u{3B3}",
    "delta;" => "\u{3B4}",
    "epsilon;" => "\u{3B5}",
    "zeta;" => "\u{3B6}",
    "eta;" => "\u{3B7}",
    "theta;" => "\u{3B8}",
    "iota;" => "\u{3B9}",
    "kappa;" => "\u{3BA}",
    "lambda;" => "\u{3BB}",
    "mu;" => "\u{3BC}",
    "nu;" => "\u{3BD}",
    "xi;" => "\u{3BE}",
    "omicron;" => "\u{3BF}",
    "pi;" => "\u{3C0}",
    "rho;" => "\u{3C1}",
    "sigmaf;" => "\u{3C2}",
    "sigma;" => "\u{3C3}",
    "tau;" => "\u{3C4}",
    "upsilon;" => "\u{3C5}",
    "phi;" => "\u{3C6}",
    "chi;" => "\u{3C7}",
    "psi;" => "\u{3C8}",
    "omega;" => "\u{3C9}",
    "thetasym;" => "\u{3D1}",
    "upsih;" => "\u{3D2}",
    "piv;" => "\u{3D6}",

    // Multi-codepoint references
    "NotEqualTilde;" => "\u{2242}\u{338}",
    "fjlig;" => "fj",
};

lazy_static! {
    /// Longest key in the table, bounds the prefix search
    pub static ref LONGEST_ENTITY_LENGTH: usize =
        ENTITIES.keys().map(|k| k.len()).max().unwrap_or(0);
}

/// Replacements for the 0x80..=0x9F range of numeric character references
/// (windows-1252 leftovers). Codes without a replacement map to themselves.
pub fn cp1252_remap(code: u32) -> u32 {
    match code {
        0x80 => 0x20AC,
        0x82 => 0x201A,
        0x83 => 0x0192,
        0x84 => 0x201E,
        0x85 => 0x2026,
        0x86 => 0x2020,
        0x87 => 0x2021,
        0x88 => 0x02C6,
        0x89 => 0x2030,
        0x8A => 0x0160,
        0x8B => 0x2039,
        0x8C => 0x0152,
        0x8E => 0x017D,
        0x91 => 0x2018,
        0x92 => 0x2019,
        0x93 => 0x201C,
        0x94 => 0x201D,
        0x95 => 0x2022,
        0x96 => 0x2013,
        0x97 => 0x2014,
        0x98 => 0x02DC,
        0x99 => 0x2122,
        0x9A => 0x0161,
        0x9B => 0x203A,
        0x9C => 0x0153,
        0x9E => 0x017E,
        0x9F => 0x0178,
        _ => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_entities_have_both_forms() {
        assert_eq!(ENTITIES.get("copy"), Some(&"\u{A9}"));
        assert_eq!(ENTITIES.get("copy;"), Some(&"\u{A9}"));
        assert_eq!(ENTITIES.get("not"), Some(&"\u{AC}"));
        assert_eq!(ENTITIES.get("not;"), Some(&"\u{AC}"));
    }

    #[test]
    fn semicolon_only_entities() {
        assert_eq!(ENTITIES.get("notin;"), Some(&"\u{2209}"));
        assert_eq!(ENTITIES.get("notin"), None);
        assert_eq!(ENTITIES.get("apos;"), Some(&"'"));
        assert_eq!(ENTITIES.get("apos"), None);
    }

    #[test]
    fn remap_table() {
        assert_eq!(cp1252_remap(0x80), 0x20AC);
        assert_eq!(cp1252_remap(0x99), 0x2122);
        // holes map to themselves
        assert_eq!(cp1252_remap(0x81), 0x81);
        assert_eq!(cp1252_remap(0x9D), 0x9D);
    }

    #[test]
    fn longest_length_covers_multi_codepoint_names() {
        assert!(*LONGEST_ENTITY_LENGTH >= "NotEqualTilde;".len());
    }
}
