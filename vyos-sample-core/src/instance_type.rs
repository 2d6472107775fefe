//! Instance type - Validated parsing of EC2 instance type strings
//!
//! `"t3.medium"` parses into [`InstanceClass::T3`] and [`InstanceSize::Medium`].
//! Anything else that does not name a known class and size is rejected here,
//! before a single resource is declared.

use std::fmt;
use std::str::FromStr;

/// Instance type parse error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InstanceTypeError {
    #[error("Invalid instance type '{0}': expected <class>.<size> (e.g. t3.medium)")]
    MissingDelimiter(String),

    #[error("Invalid instance type '{0}': class and size must both be non-empty")]
    EmptyPart(String),

    #[error("Invalid instance type '{0}': expected exactly one '.' delimiter")]
    TooManyParts(String),

    #[error("Unknown instance class '{class}' in '{value}'")]
    UnknownClass { value: String, class: String },

    #[error("Unknown instance size '{size}' in '{value}'")]
    UnknownSize { value: String, size: String },
}

macro_rules! define_instance_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($token:expr, $wire:expr)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All known values
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Upper-case token (e.g. "T3", "MEDIUM")
            pub fn token(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }

            /// Form used inside an EC2 instance type string (e.g. "t3", "medium")
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }

            fn lookup(s: &str) -> Option<Self> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s) || v.token().eq_ignore_ascii_case(s))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

define_instance_enum!(
    /// EC2 instance class (family and generation)
    InstanceClass {
        T2 => ("T2", "t2"),
        T3 => ("T3", "t3"),
        T3a => ("T3A", "t3a"),
        T4g => ("T4G", "t4g"),
        M5 => ("M5", "m5"),
        M6i => ("M6I", "m6i"),
        M7i => ("M7I", "m7i"),
        C5 => ("C5", "c5"),
        C5n => ("C5N", "c5n"),
        C6i => ("C6I", "c6i"),
        C6in => ("C6IN", "c6in"),
        C7i => ("C7I", "c7i"),
        R5 => ("R5", "r5"),
        R6i => ("R6I", "r6i"),
    }
);

define_instance_enum!(
    /// EC2 instance size
    InstanceSize {
        Nano => ("NANO", "nano"),
        Micro => ("MICRO", "micro"),
        Small => ("SMALL", "small"),
        Medium => ("MEDIUM", "medium"),
        Large => ("LARGE", "large"),
        Xlarge => ("XLARGE", "xlarge"),
        Xlarge2 => ("XLARGE2", "2xlarge"),
        Xlarge4 => ("XLARGE4", "4xlarge"),
        Xlarge8 => ("XLARGE8", "8xlarge"),
    }
);

/// A validated EC2 instance type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceType {
    pub class: InstanceClass,
    pub size: InstanceSize,
}

impl InstanceType {
    pub fn of(class: InstanceClass, size: InstanceSize) -> Self {
        Self { class, size }
    }
}

impl FromStr for InstanceType {
    type Err = InstanceTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split('.').collect();
        let (class, size) = match parts.as_slice() {
            [_] => return Err(InstanceTypeError::MissingDelimiter(value.to_string())),
            [class, size] => (*class, *size),
            _ => return Err(InstanceTypeError::TooManyParts(value.to_string())),
        };
        if class.is_empty() || size.is_empty() {
            return Err(InstanceTypeError::EmptyPart(value.to_string()));
        }

        let class_value =
            InstanceClass::lookup(class).ok_or_else(|| InstanceTypeError::UnknownClass {
                value: value.to_string(),
                class: class.to_string(),
            })?;
        let size_value =
            InstanceSize::lookup(size).ok_or_else(|| InstanceTypeError::UnknownSize {
                value: value.to_string(),
                size: size.to_string(),
            })?;

        Ok(Self::of(class_value, size_value))
    }
}

impl fmt::Display for InstanceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.size)
    }
}
