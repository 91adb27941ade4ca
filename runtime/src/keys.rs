use std::num::NonZeroU32;

/// Interned string handle. Every class, method and field name (and every
/// descriptor) in the runtime is one of these.
pub type Symbol = lasso::Spur;

macro_rules! index_key {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(NonZeroU32);

        impl $name {
            pub fn new(raw: NonZeroU32) -> Self {
                Self(raw)
            }

            /// One-based: pass the arena length *after* the push.
            pub fn from_usize(len: usize) -> Self {
                Self(NonZeroU32::new(len as u32).expect("zero arena index"))
            }

            pub fn to_index(self) -> usize {
                (self.0.get() - 1) as usize
            }

            pub fn into_inner(self) -> NonZeroU32 {
                self.0
            }
        }
    };
}

index_key!(ClassId);
index_key!(MethodId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    pub name: Symbol,
    pub desc: Symbol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub name: Symbol,
    pub desc: Symbol,
}

/// Key for the native-method registry: the owning class plus name and
/// descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FullyQualifiedMethodKey {
    pub class: Symbol,
    pub name: Symbol,
    pub desc: Symbol,
}

impl FullyQualifiedMethodKey {
    pub fn new(class: Symbol, name: Symbol, desc: Symbol) -> Self {
        Self { class, name, desc }
    }
}
