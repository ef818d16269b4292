//! Composite source: the bitwise XOR of up to [`MAX_XOR_MEMBERS`] sources.
//!
//! XOR of independent streams is at least as random as the best of them, so
//! this is how a weak generator gets "whitened" by a strong one. Order does
//! not affect the values, only the display name.

use super::{GeneratorInfo, GeneratorKind, RandomSource, StreamStats};
use crate::error::{BatteryError, Result};

/// Maximum number of members in one composite.
pub const MAX_XOR_MEMBERS: usize = 100;

/// One member and the seed it is pinned to, if any.
pub struct XorMember {
    source: Box<dyn RandomSource>,
    seed: Option<u64>,
}

impl XorMember {
    pub fn new(source: Box<dyn RandomSource>, seed: Option<u64>) -> Self {
        Self { source, seed }
    }
}

pub struct XorSource {
    info: GeneratorInfo,
    members: Vec<XorMember>,
    mask: u32,
}

impl XorSource {
    pub fn new(members: Vec<XorMember>) -> Result<Self> {
        if members.is_empty() {
            return Err(BatteryError::NoGenerators);
        }
        if members.len() > MAX_XOR_MEMBERS {
            return Err(BatteryError::TooManyGenerators {
                count: members.len(),
                max: MAX_XOR_MEMBERS,
            });
        }
        let bits = members.iter().map(|m| m.source.bits()).min().unwrap_or(32);
        let names: Vec<&str> = members.iter().map(|m| m.source.info().name.as_str()).collect();
        let name = format!("xor({})", names.join(","));
        let mask = if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 };
        Ok(Self {
            info: GeneratorInfo::new(name, GeneratorKind::Xor, bits),
            members,
            mask,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl RandomSource for XorSource {
    fn info(&self) -> &GeneratorInfo {
        &self.info
    }

    fn next_uint(&mut self) -> u32 {
        let mut acc = 0u32;
        for member in &mut self.members {
            acc ^= member.source.next_uint();
        }
        acc & self.mask
    }

    /// Member `i` reseeds to its pinned seed, or to `seed + i`.
    fn reset(&mut self, seed: u64) {
        for (i, member) in self.members.iter_mut().enumerate() {
            member
                .source
                .reset(member.seed.unwrap_or(seed.wrapping_add(i as u64)));
        }
    }

    fn take_error(&mut self) -> Option<BatteryError> {
        self.members.iter_mut().find_map(|m| m.source.take_error())
    }

    fn stream_stats(&self) -> Option<StreamStats> {
        self.members.iter().find_map(|m| m.source.stream_stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::create_builtin;

    fn member(name: &str, seed: u64) -> XorMember {
        XorMember::new(create_builtin(name, seed).unwrap(), Some(seed))
    }

    #[test]
    fn test_name_and_width() {
        let x = XorSource::new(vec![member("stdrng", 1), member("randu", 2)]).unwrap();
        assert_eq!(x.info().name, "xor(stdrng,randu)");
        assert_eq!(x.bits(), 31);
        assert_eq!(x.len(), 2);
    }

    #[test]
    fn test_value_is_xor_of_members() {
        let mut a = create_builtin("lcg64", 5).unwrap();
        let mut b = create_builtin("xorshift32", 6).unwrap();
        let mut x = XorSource::new(vec![member("lcg64", 5), member("xorshift32", 6)]).unwrap();
        for _ in 0..50 {
            assert_eq!(x.next_uint(), a.next_uint() ^ b.next_uint());
        }
    }

    #[test]
    fn test_member_order_does_not_change_values() {
        let mut ab = XorSource::new(vec![member("stdrng", 11), member("minstd", 12)]).unwrap();
        let mut ba = XorSource::new(vec![member("minstd", 12), member("stdrng", 11)]).unwrap();
        for _ in 0..100 {
            assert_eq!(ab.next_uint(), ba.next_uint());
        }
    }

    #[test]
    fn test_values_masked_to_narrowest_member() {
        let mut x = XorSource::new(vec![member("stdrng", 1), member("minstd", 1)]).unwrap();
        for _ in 0..1000 {
            assert!(x.next_uint() < 1 << 31);
        }
    }

    #[test]
    fn test_reset_uses_offset_seeds_for_unpinned_members() {
        let unpinned = |name: &str| XorMember::new(create_builtin(name, 0).unwrap(), None);
        let mut x = XorSource::new(vec![unpinned("lcg64"), unpinned("lcg64")]).unwrap();
        x.reset(100);
        let mut a = create_builtin("lcg64", 100).unwrap();
        let mut b = create_builtin("lcg64", 101).unwrap();
        assert_eq!(x.next_uint(), a.next_uint() ^ b.next_uint());
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut x = XorSource::new(vec![member("stdrng", 1), member("xorshift32", 2)]).unwrap();
        let mut y = XorSource::new(vec![member("stdrng", 3), member("xorshift32", 2)]).unwrap();
        let xs: Vec<u32> = (0..8).map(|_| x.next_uint()).collect();
        let ys: Vec<u32> = (0..8).map(|_| y.next_uint()).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_member_limits() {
        assert!(matches!(XorSource::new(vec![]), Err(BatteryError::NoGenerators)));
        let full: Vec<_> = (0..MAX_XOR_MEMBERS as u64).map(|i| member("xorshift32", i)).collect();
        assert!(XorSource::new(full).is_ok());
        let over: Vec<_> = (0..=MAX_XOR_MEMBERS as u64).map(|i| member("xorshift32", i)).collect();
        assert!(matches!(
            XorSource::new(over),
            Err(BatteryError::TooManyGenerators { count: 101, max: 100 })
        ));
    }
}
