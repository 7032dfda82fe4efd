//! Output formatting options understood by the export endpoint.
//!
//! Each option is sent as a small integer code. The enums below mirror those
//! codes one to one and know their own default, so a request that leaves an
//! option unset still produces a fully specified query.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! endpoint_code_enum {
    (
        $(#[$meta:meta])*
        $name:ident, param = $param:literal, default = $default:ident {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal => $label:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "u8", into = "u8")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// Query parameter this option is sent as
            pub const PARAM: &'static str = $param;

            /// Endpoint code
            pub fn code(&self) -> u8 {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            /// Human-readable description of the format
            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl TryFrom<u8> for $name {
            type Error = String;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $($code => Ok($name::$variant),)+
                    _ => Err(format!("Invalid {} code: {code}", $param)),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> Self {
                value.code()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.label())
            }
        }
    };
}

endpoint_code_enum! {
    /// Date column format (`datf`)
    DateFormat, param = "datf", default = YyyyMmDd {
        /// YYYYMMDD
        YyyyMmDd = 1 => "YYYYMMDD",
        /// YYMMDD
        YyMmDd = 2 => "YYMMDD",
        /// DDMMYY
        DdMmYy = 3 => "DDMMYY",
        /// DD/MM/YY
        DdMmYySlashed = 4 => "DD/MM/YY",
        /// MM/DD/YY
        MmDdYySlashed = 5 => "MM/DD/YY",
    }
}

endpoint_code_enum! {
    /// Combined date-time format (`dtf`)
    DateTimeFormat, param = "dtf", default = DdMmYyyyHhMmSs {
        /// YYYYMMDD HHMMSS
        YyyyMmDdHhMmSs = 1 => "YYYYMMDD HHMMSS",
        /// YYYYMMDD HHMM
        YyyyMmDdHhMm = 2 => "YYYYMMDD HHMM",
        /// DD.MM.YY HH:MM:SS
        DdMmYyHhMmSs = 3 => "DD.MM.YY HH:MM:SS",
        /// DD.MM.YYYY HH:MM:SS
        DdMmYyyyHhMmSs = 4 => "DD.MM.YYYY HH:MM:SS",
        /// DD/MM/YY HH:MM:SS
        DdMmYySlashedHhMmSs = 5 => "DD/MM/YY HH:MM:SS",
    }
}

endpoint_code_enum! {
    /// Time column format (`tmf`)
    TimeFormat, param = "tmf", default = HhMmColon {
        /// HHMMSS
        HhMmSs = 1 => "HHMMSS",
        /// HHMM
        HhMm = 2 => "HHMM",
        /// HH:MM:SS
        HhMmSsColon = 3 => "HH:MM:SS",
        /// HH:MM
        HhMmColon = 4 => "HH:MM",
    }
}

endpoint_code_enum! {
    /// Field separator (`sep`)
    FieldSeparator, param = "sep", default = Comma {
        /// ,
        Comma = 1 => "comma (,)",
        /// .
        Period = 2 => "period (.)",
        /// ;
        Semicolon = 3 => "semicolon (;)",
        /// Tab character
        Tab = 4 => "tab",
        /// Space character
        Space = 5 => "space",
    }
}

endpoint_code_enum! {
    /// Which end of a candle its timestamp refers to (`MSOR`)
    CandleTime, param = "MSOR", default = Open {
        /// Candle open time
        Open = 0 => "candle open",
        /// Candle close time
        Close = 1 => "candle close",
    }
}
