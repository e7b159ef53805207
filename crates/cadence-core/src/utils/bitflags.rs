// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! A macro to define small flag sets in a structured way.

/// Defines a `Copy` flag-set type over an unsigned integer with named constants
/// and the usual set operations.
#[macro_export]
#[doc(hidden)]
macro_rules! cadence_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            /// An empty set of flags.
            pub const EMPTY: Self = Self { bits: 0 };

            /// Every defined flag.
            pub const ALL: Self = Self { bits: 0 $(| $flag_value)* };

            /// Creates a flag set from raw bits, dropping undefined bits.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits: bits & Self::ALL.bits }
            }

            /// Returns the raw value of the flag set.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// Returns `true` if no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// Returns `true` if all flags in `other` are contained within `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// Returns `true` if any flag in `other` is contained within `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Inserts the flags in `other` into `self`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Removes the flags in `other` from `self`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// Inserts or removes `other` depending on `value`.
            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }

            /// Toggles the flags in `other` in `self`.
            pub fn toggle(&mut self, other: Self) {
                self.bits ^= other.bits;
            }

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let mut set = f.debug_set();
                $(
                    if self.contains(Self::$flag_name) {
                        set.entry(&stringify!($flag_name));
                    }
                )*
                set.finish()
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::cadence_bitflags! {
        struct TestFlags: u8 {
            const A = 1 << 0;
            const B = 1 << 1;
            const C = 1 << 2;
        }
    }

    #[test]
    fn all_and_empty() {
        assert_eq!(TestFlags::ALL.bits(), 0b111);
        assert!(TestFlags::EMPTY.is_empty());
        assert!(TestFlags::ALL.contains(TestFlags::A | TestFlags::C));
    }

    #[test]
    fn from_bits_truncate_drops_unknown_bits() {
        assert_eq!(TestFlags::from_bits_truncate(0xFF), TestFlags::ALL);
    }

    #[test]
    fn set_insert_remove_toggle() {
        let mut flags = TestFlags::EMPTY;
        flags.insert(TestFlags::A);
        flags.set(TestFlags::B, true);
        assert!(flags.contains(TestFlags::A | TestFlags::B));
        flags.set(TestFlags::A, false);
        assert!(!flags.intersects(TestFlags::A));
        flags.toggle(TestFlags::C);
        assert_eq!(flags, TestFlags::B | TestFlags::C);
        flags.remove(TestFlags::B);
        assert_eq!(flags & TestFlags::ALL, TestFlags::C);
    }

    #[test]
    fn debug_lists_flag_names() {
        let flags = TestFlags::A | TestFlags::C;
        assert_eq!(format!("{flags:?}"), "{\"A\", \"C\"}");
    }
}
