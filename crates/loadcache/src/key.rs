//! Key derivation for parameter tuples
//!
//! Every parameter is rendered with `Display` and framed as `<len>:<text>;`,
//! so tuples whose renderings merely concatenate to the same text still get
//! distinct keys. Smart pointers and references display their pointee, which
//! makes equal logical parameters collide regardless of where they live.

use std::fmt::{self, Display, Write};

/// Derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parameter tuple accepted by a loader
pub trait KeyParams {
    /// Number of parameters in the tuple
    const ARITY: usize;

    /// Append every parameter to `buf`, in order
    fn write_key(&self, buf: &mut KeyBuf);

    /// Derive the cache key for this tuple
    fn cache_key(&self) -> CacheKey {
        let mut buf = KeyBuf::default();
        self.write_key(&mut buf);
        buf.finish()
    }
}

/// Accumulates length-prefixed parameter renderings
#[derive(Debug, Default)]
pub struct KeyBuf {
    out: String,
    scratch: String,
}

impl KeyBuf {
    /// Append one parameter
    pub fn push<T: Display + ?Sized>(&mut self, param: &T) {
        self.scratch.clear();
        // Writing into a String never fails
        let _ = write!(self.scratch, "{}", param);
        let _ = write!(self.out, "{}:", self.scratch.len());
        self.out.push_str(&self.scratch);
        self.out.push(';');
    }

    fn finish(self) -> CacheKey {
        CacheKey(self.out)
    }
}

impl KeyParams for () {
    const ARITY: usize = 0;

    fn write_key(&self, _buf: &mut KeyBuf) {}
}

macro_rules! tuple_params {
    ($arity:expr; $($name:ident . $idx:tt),+) => {
        impl<$($name: Display),+> KeyParams for ($($name,)+) {
            const ARITY: usize = $arity;

            fn write_key(&self, buf: &mut KeyBuf) {
                $(buf.push(&self.$idx);)+
            }
        }
    };
}

tuple_params!(1; A.0);
tuple_params!(2; A.0, B.1);
tuple_params!(3; A.0, B.1, C.2);
tuple_params!(4; A.0, B.1, C.2, D.3);
tuple_params!(5; A.0, B.1, C.2, D.3, E.4);
tuple_params!(6; A.0, B.1, C.2, D.3, E.4, F.5);
tuple_params!(7; A.0, B.1, C.2, D.3, E.4, F.5, G.6);
tuple_params!(8; A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_key_format() {
        assert_eq!((1, "ab").cache_key().as_str(), "1:1;2:ab;");
        assert_eq!(().cache_key().as_str(), "");
    }

    #[test]
    fn test_key_no_concat_collision() {
        let a = ("#", "").cache_key();
        let b = ("", "#").cache_key();
        assert_ne!(a, b);

        let c = ("ab", "c").cache_key();
        let d = ("a", "bc").cache_key();
        assert_ne!(c, d);
    }

    #[test]
    fn test_key_order_sensitive() {
        assert_ne!((1, 2).cache_key(), (2, 1).cache_key());
    }

    #[test]
    fn test_key_derefs_pointers() {
        let owned = (String::from("user"), 7u32).cache_key();
        let boxed = (Box::new("user"), Arc::new(7u32)).cache_key();
        let borrowed = (&"user", &7u32).cache_key();

        assert_eq!(owned, boxed);
        assert_eq!(owned, borrowed);
    }

    #[test]
    fn test_arity() {
        assert_eq!(<() as KeyParams>::ARITY, 0);
        assert_eq!(<(u8,) as KeyParams>::ARITY, 1);
        assert_eq!(<(u8, u8, u8) as KeyParams>::ARITY, 3);
    }
}
