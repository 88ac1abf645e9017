//------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Units {
    Byte,
    Kibibyte,
    Mebibyte,
    Gibibyte,
    Tebibyte,
    Pebibyte,
    Exbibyte,
}

impl Units {
    pub fn to_string_short(&self) -> String {
        use Units::*;

        String::from(match self {
            Byte => "",
            Kibibyte => "KiB",
            Mebibyte => "MiB",
            Gibibyte => "GiB",
            Tebibyte => "TiB",
            Pebibyte => "PiB",
            Exbibyte => "EiB",
        })
    }
}

/// Picks the smallest binary unit that brings the value down to 8192 or
/// less.
pub fn to_pretty_print_units(bytes: u64) -> (u64, Units) {
    use Units::*;
    let units = [
        Byte, Kibibyte, Mebibyte, Gibibyte, Tebibyte, Pebibyte, Exbibyte,
    ];

    // choose the unit that fits the input value
    let mut val = bytes;
    let mut i = 0;
    while val > 8192 && i + 1 < units.len() {
        val = match val {
            8193..=1048575 => (val as f64 / 1024.0).round() as u64,
            _ => val / 1024,
        };
        i += 1;
    }

    (val, units[i])
}

//------------------------------------------


//------------------------------------------
