//! ABI tag computation.
//!
//! An addon binary is loadable by every runtime release that shares its
//! module ABI version (`NODE_MODULE_VERSION`). The tag is computed here and
//! nowhere else: the packager writes it into archive names and the matcher
//! compares it against the host, so both must agree byte for byte.

use std::fmt;

use semver::Version;

use crate::core::host::RuntimeFamily;

/// Node.js major version -> module ABI version.
const NODE_ABI: &[(u64, u32)] = &[
    (4, 46),
    (5, 47),
    (6, 48),
    (7, 51),
    (8, 57),
    (9, 59),
    (10, 64),
    (11, 67),
    (12, 72),
    (13, 79),
    (14, 83),
    (15, 88),
    (16, 93),
    (17, 102),
    (18, 108),
    (19, 111),
    (20, 115),
    (21, 120),
    (22, 127),
    (23, 131),
    (24, 137),
];

/// Electron major version -> module ABI version.
const ELECTRON_ABI: &[(u64, u32)] = &[
    (2, 57),
    (3, 64),
    (4, 69),
    (5, 70),
    (6, 73),
    (7, 75),
    (8, 76),
    (9, 80),
    (10, 82),
    (11, 85),
    (12, 87),
    (13, 89),
    (14, 97),
    (15, 98),
    (16, 99),
    (17, 101),
    (18, 103),
    (19, 106),
    (20, 107),
    (21, 109),
    (22, 110),
    (23, 113),
    (24, 114),
    (25, 116),
    (26, 116),
    (27, 118),
    (28, 119),
    (29, 121),
    (30, 123),
    (31, 125),
    (32, 128),
    (33, 130),
    (34, 132),
    (35, 133),
    (36, 135),
];

/// NW.js `0.<minor>` series start -> module ABI version of the bundled Node.
///
/// A row applies from its minor version up to the next row.
const NODE_WEBKIT_ABI: &[(u64, u32)] = &[
    (13, 47),
    (15, 48),
    (18, 51),
    (23, 57),
    (26, 59),
    (31, 64),
    (35, 67),
    (38, 72),
    (43, 79),
    (45, 83),
    (49, 88),
    (54, 93),
    (58, 102),
    (67, 108),
    (72, 111),
    (78, 115),
    (83, 120),
    (88, 127),
    (93, 131),
];

/// A module ABI version, rendered as its bare number (`108`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AbiTag(u32);

impl AbiTag {
    /// Wrap a raw ABI number.
    pub fn new(value: u32) -> Self {
        AbiTag(value)
    }
}

impl fmt::Display for AbiTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compute the ABI tag for a runtime release.
///
/// Returns `None` for releases outside the known tables; callers treat that
/// as "no prebuilt addon can match".
pub fn abi_tag(family: RuntimeFamily, version: &Version) -> Option<AbiTag> {
    let abi = match family {
        RuntimeFamily::Node => exact_major(NODE_ABI, version.major),
        RuntimeFamily::Electron => exact_major(ELECTRON_ABI, version.major),
        RuntimeFamily::NodeWebkit => {
            if version.major != 0 {
                return None;
            }
            NODE_WEBKIT_ABI
                .iter()
                .rev()
                .find(|(minor, _)| *minor <= version.minor)
                .map(|(_, abi)| *abi)
        }
    };
    abi.map(AbiTag)
}

fn exact_major(table: &[(u64, u32)], major: u64) -> Option<u32> {
    table
        .iter()
        .find(|(m, _)| *m == major)
        .map(|(_, abi)| *abi)
}

/// One release per table row, covering every known tag.
#[cfg(test)]
pub(crate) fn known_releases() -> Vec<(RuntimeFamily, Version)> {
    let node = NODE_ABI
        .iter()
        .map(|(major, _)| (RuntimeFamily::Node, Version::new(*major, 0, 0)));
    let electron = ELECTRON_ABI
        .iter()
        .map(|(major, _)| (RuntimeFamily::Electron, Version::new(*major, 1, 0)));
    let node_webkit = NODE_WEBKIT_ABI
        .iter()
        .map(|(minor, _)| (RuntimeFamily::NodeWebkit, Version::new(0, *minor, 0)));
    node.chain(electron).chain(node_webkit).collect()
}
