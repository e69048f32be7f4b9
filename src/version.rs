//! Product and version identification for target devices

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VersionError {
    #[error("invalid version string '{0}'")]
    Invalid(String),
}

/// Normalized product family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Product {
    Em,
    Bigip,
    Bigiq,
    Wanjet,
    Arx,
    Sam,
    Nsx,
    #[default]
    Unknown,
}

static PRODUCT_PATTERNS: Lazy<Vec<(Regex, Product)>> = Lazy::new(|| {
    [
        (r"(?i)(?:EM|Enterprise Manager)", Product::Em),
        (r"(?i)BIG-?IP_SAM", Product::Sam),
        (r"(?i)BIG-?IP", Product::Bigip),
        (r"(?i)BIG-?IQ", Product::Bigiq),
        (r"(?i)(?:WANJET|WJ)", Product::Wanjet),
        (r"(?i)ARX", Product::Arx),
        (r"(?i)NSX", Product::Nsx),
    ]
    .into_iter()
    .filter_map(|(pattern, product)| Regex::new(pattern).ok().map(|re| (re, product)))
    .collect()
});

static VERSION_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(\d+)\.(\d+)\.?(\d+)?[^\d]*(\d+)?\.?(\d+)?\.?(\d+)?").ok()
});

impl Product {
    /// Detect the product family mentioned anywhere in `text`
    pub fn detect(text: &str) -> Self {
        PRODUCT_PATTERNS
            .iter()
            .find(|(re, _)| re.is_match(text))
            .map(|(_, product)| *product)
            .unwrap_or_default()
    }

    pub fn is_bigip(self) -> bool {
        self == Product::Bigip
    }

    pub fn is_bigiq(self) -> bool {
        self == Product::Bigiq
    }

    pub fn is_em(self) -> bool {
        self == Product::Em
    }

    /// Name as printed by the devices themselves
    pub fn display_name(self) -> &'static str {
        match self {
            Product::Em => "EM",
            Product::Bigip => "BIG-IP",
            Product::Bigiq => "BIG-IQ",
            Product::Wanjet => "WANJET",
            Product::Arx => "ARX",
            Product::Sam => "SAM",
            Product::Nsx => "NSX",
            Product::Unknown => "",
        }
    }
}

/// Product version plus build numbers, e.g. `bigip 11.0.1 build6901.45.4`.
///
/// Versions of different products are unordered: every comparison between
/// them is false.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Version {
    pub product: Product,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
    pub hotfix: u32,
    pub devel: u32,
}

impl Version {
    pub const fn new(product: Product, major: u32, minor: u32, patch: u32) -> Self {
        Self {
            product,
            major,
            minor,
            patch,
            build: 0,
            hotfix: 0,
            devel: 0,
        }
    }

    pub fn bigip(major: u32, minor: u32, patch: u32) -> Self {
        Self::new(Product::Bigip, major, minor, patch)
    }

    pub fn em(major: u32, minor: u32, patch: u32) -> Self {
        Self::new(Product::Em, major, minor, patch)
    }

    pub fn bigiq(major: u32, minor: u32, patch: u32) -> Self {
        Self::new(Product::Bigiq, major, minor, patch)
    }

    /// Same product and at or above `major.minor.patch`
    pub fn at_least(&self, product: Product, major: u32, minor: u32, patch: u32) -> bool {
        *self >= Self::new(product, major, minor, patch)
    }

    fn numbers(&self) -> [u32; 6] {
        [
            self.major,
            self.minor,
            self.patch,
            self.build,
            self.hotfix,
            self.devel,
        ]
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.product != other.product {
            return None;
        }
        Some(self.numbers().cmp(&other.numbers()))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = VERSION_PATTERN
            .as_ref()
            .and_then(|re| re.captures(s))
            .ok_or_else(|| VersionError::Invalid(s.to_string()))?;

        let mut numbers = [0u32; 6];
        for (i, slot) in numbers.iter_mut().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                *slot = m
                    .as_str()
                    .parse()
                    .map_err(|_| VersionError::Invalid(s.to_string()))?;
            }
        }
        let [major, minor, patch, build, hotfix, devel] = numbers;

        Ok(Self {
            product: Product::detect(s),
            major,
            minor,
            patch,
            build,
            hotfix,
            devel,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.product != Product::Unknown {
            write!(f, "{} ", self.product.display_name())?;
        }
        write!(f, "{}.{}.{} ", self.major, self.minor, self.patch)?;
        if self.devel != 0 {
            write!(f, "{}.{}.{}", self.build, self.hotfix, self.devel)
        } else {
            write!(f, "{}.{}", self.build, self.hotfix)
        }
    }
}
