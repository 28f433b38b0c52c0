use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

id_newtype!(
    /// Index of a variable slot in the program's variable table.
    ///
    /// Ids stay valid for the whole program lifetime; an absent binding is an
    /// `Option<DataId>`, never a sentinel.
    DataId
);
id_newtype!(IteratorId);
id_newtype!(OperatorId);
id_newtype!(PredicateId);
id_newtype!(FunctionId);
id_newtype!(CollectionId);
id_newtype!(FileAccessId);
id_newtype!(
    /// Runtime slot holding an opened locator handle.
    LocatorSlot
);
