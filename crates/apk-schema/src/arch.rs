//! CPU architectures as named by apk repositories.
//!
//! Repositories lay packages out as `<repo>/<arch>/<file>.apk`, and the
//! system keyring keeps an architecture-named subdirectory, so the exact
//! spelling matters. Go (`GOARCH`), Rust (`target_arch`) and OCI platform
//! names are accepted on input and normalized to the apk spelling.
//!
//! # Example
//!
//! ```
//! use apk_schema::Arch;
//!
//! let arch: Arch = "amd64".parse().unwrap();
//! assert_eq!(arch.as_str(), "x86_64");
//! ```

use thiserror::Error;

/// Errors raised while parsing an architecture name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArchError {
    /// The name does not correspond to any architecture apk publishes.
    #[error("Unknown architecture: {0}")]
    Unknown(String),
}

/// An architecture that apk repositories publish packages for.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit x86
    #[default]
    X86_64,
    /// 32-bit x86
    X86,
    /// 64-bit ARM
    Aarch64,
    /// ARMv6 hard-float
    Armhf,
    /// ARMv7 hard-float
    Armv7,
    /// 64-bit little-endian POWER
    Ppc64le,
    /// IBM Z
    S390x,
    /// 64-bit RISC-V
    Riscv64,
    /// 64-bit `LoongArch`
    Loongarch64,
}

impl Arch {
    /// Every architecture, in the order apk lists them.
    pub const ALL: [Self; 9] = [
        Self::X86_64,
        Self::X86,
        Self::Aarch64,
        Self::Armhf,
        Self::Armv7,
        Self::Ppc64le,
        Self::S390x,
        Self::Riscv64,
        Self::Loongarch64,
    ];

    /// The architecture this binary was compiled for.
    pub fn current() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self::X86_64
        }
        #[cfg(target_arch = "x86")]
        {
            Self::X86
        }
        #[cfg(target_arch = "aarch64")]
        {
            Self::Aarch64
        }
        #[cfg(target_arch = "arm")]
        {
            Self::Armv7
        }
        #[cfg(all(target_arch = "powerpc64", target_endian = "little"))]
        {
            Self::Ppc64le
        }
        #[cfg(target_arch = "s390x")]
        {
            Self::S390x
        }
        #[cfg(target_arch = "riscv64")]
        {
            Self::Riscv64
        }
        #[cfg(target_arch = "loongarch64")]
        {
            Self::Loongarch64
        }
        #[cfg(not(any(
            target_arch = "x86_64",
            target_arch = "x86",
            target_arch = "aarch64",
            target_arch = "arm",
            all(target_arch = "powerpc64", target_endian = "little"),
            target_arch = "s390x",
            target_arch = "riscv64",
            target_arch = "loongarch64"
        )))]
        {
            Self::X86_64
        }
    }

    /// The apk spelling, as used in repository paths.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X86_64 => "x86_64",
            Self::X86 => "x86",
            Self::Aarch64 => "aarch64",
            Self::Armhf => "armhf",
            Self::Armv7 => "armv7",
            Self::Ppc64le => "ppc64le",
            Self::S390x => "s390x",
            Self::Riscv64 => "riscv64",
            Self::Loongarch64 => "loongarch64",
        }
    }

    /// Go-convention architecture name (`GOARCH`, with the ARM variant
    /// appended the way OCI platforms spell it).
    pub fn go_name(self) -> &'static str {
        match self {
            Self::X86_64 => "amd64",
            Self::X86 => "386",
            Self::Aarch64 => "arm64",
            Self::Armhf => "arm/v6",
            Self::Armv7 => "arm/v7",
            Self::Ppc64le => "ppc64le",
            Self::S390x => "s390x",
            Self::Riscv64 => "riscv64",
            Self::Loongarch64 => "loong64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = ArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "x86_64" | "amd64" => Ok(Self::X86_64),
            "x86" | "386" | "i386" | "i686" => Ok(Self::X86),
            "aarch64" | "arm64" | "arm64/v8" => Ok(Self::Aarch64),
            "armhf" | "arm/v6" => Ok(Self::Armhf),
            "armv7" | "arm/v7" | "arm" => Ok(Self::Armv7),
            "ppc64le" | "powerpc64le" => Ok(Self::Ppc64le),
            "s390x" => Ok(Self::S390x),
            "riscv64" => Ok(Self::Riscv64),
            "loongarch64" | "loong64" => Ok(Self::Loongarch64),
            _ => Err(ArchError::Unknown(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_go_names_map_to_apk_names() {
        let cases = [
            ("amd64", Arch::X86_64),
            ("arm64", Arch::Aarch64),
            ("386", Arch::X86),
            ("arm/v6", Arch::Armhf),
            ("arm/v7", Arch::Armv7),
            ("loong64", Arch::Loongarch64),
            ("ppc64le", Arch::Ppc64le),
        ];
        for (name, expected) in cases {
            assert_eq!(name.parse::<Arch>().unwrap(), expected, "parsing {name}");
        }
    }

    #[test]
    fn test_current_matches_build_target() {
        let current = Arch::current();
        match std::env::consts::ARCH {
            "x86_64" => assert_eq!(current, Arch::X86_64),
            "aarch64" => assert_eq!(current, Arch::Aarch64),
            "powerpc64" if cfg!(target_endian = "little") => assert_eq!(current, Arch::Ppc64le),
            "powerpc64" => assert_ne!(current, Arch::Ppc64le),
            _ => {}
        }
    }

    #[test]
    fn test_every_arch_round_trips_through_both_spellings() {
        for arch in Arch::ALL {
            assert_eq!(arch.as_str().parse::<Arch>().unwrap(), arch);
            assert_eq!(arch.go_name().parse::<Arch>().unwrap(), arch);
        }
    }

    #[test]
    fn test_unknown_arch_is_rejected() {
        let err = "sparc".parse::<Arch>().unwrap_err();
        assert_eq!(err, ArchError::Unknown("sparc".to_string()));
    }
}
