//! Capability tags — the bitmask set algebra at the heart of the engine.
//!
//! A [`Tag`] is a set of component bits (one bit per registered component,
//! at most [`MAX_COMPONENTS`]) plus an inversion flag. Tags serve double
//! duty: every entity and component carries one as a capability
//! descriptor, and every query and view uses one as a predicate.

use serde::{Deserialize, Serialize};

use crate::component::Component;

/// The maximum number of components a single [`Engine`](crate::Engine) can
/// register. One bit per component in a `u64` flag word; the ceiling keeps
/// a `Tag` one machine word wide and cheap to copy and compare.
pub const MAX_COMPONENTS: usize = 64;

/// A set of component capabilities plus an inversion flag.
///
/// Tags are plain values: no identity, no ownership. Combining tags is a
/// bitwise OR of their flags; containment is a subset test on the flags.
/// An inverse tag negates the containment test, expressing "does NOT have
/// these capabilities".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tag {
    flags: u64,
    inverse: bool,
}

impl Tag {
    /// The empty tag. Matches every entity (the subset test is trivially
    /// true for an empty flag set).
    pub const EMPTY: Tag = Tag {
        flags: 0,
        inverse: false,
    };

    /// Tag with exactly one bit set, at `bit`.
    pub(crate) const fn from_bit(bit: u32) -> Self {
        Self {
            flags: 1 << bit,
            inverse: false,
        }
    }

    /// Tag with the given raw flag word and no inversion.
    pub(crate) const fn from_flags(flags: u64) -> Self {
        Self {
            flags,
            inverse: false,
        }
    }

    /// The raw flag word.
    #[must_use]
    pub const fn flags(self) -> u64 {
        self.flags
    }

    /// Whether this tag is inverted.
    #[must_use]
    pub const fn is_inverse(self) -> bool {
        self.inverse
    }

    /// Containment test: does this tag hold every bit of `sub`?
    ///
    /// When `sub` is inverse the result is negated, so an inverse tag
    /// matches exactly the entities its plain form would reject.
    #[must_use]
    pub const fn matches(self, sub: Tag) -> bool {
        let contains = self.flags & sub.flags == sub.flags;
        if sub.inverse { !contains } else { contains }
    }

    /// OR another tag's bits into this one (set union).
    pub fn or_in_place(&mut self, other: Tag) {
        self.flags |= other.flags;
    }

    /// Clear another tag's bits from this one via XOR.
    ///
    /// Only valid when `other`'s bits are a subset of this tag's, which
    /// holds at every call site because each component owns exactly one
    /// bit that was previously set.
    pub fn clear_in_place(&mut self, other: Tag) {
        self.flags ^= other.flags;
    }

    /// A copy of this tag with the inverse flag set.
    #[must_use]
    pub const fn inverse(self) -> Tag {
        self.with_inverse(true)
    }

    /// A copy of this tag with the inverse flag set to `inverse`.
    #[must_use]
    pub const fn with_inverse(self, inverse: bool) -> Tag {
        Tag {
            flags: self.flags,
            inverse,
        }
    }

    /// Build a tag as the union of the given elements.
    ///
    /// Each element contributes its bits: a [`Component`] contributes its
    /// single bit, a [`Tag`] contributes its whole flag word. This is the
    /// function behind the [`build_tag!`](crate::build_tag) macro.
    #[must_use]
    pub fn from_elements<I>(elements: I) -> Tag
    where
        I: IntoIterator<Item = TagElement>,
    {
        let mut tag = Tag::EMPTY;
        for element in elements {
            match element {
                TagElement::Component(component) => tag.or_in_place(component.tag()),
                TagElement::Tag(other) => tag.or_in_place(other),
            }
        }
        tag
    }
}

/// One element of a tag-building expression: either a component handle
/// (contributing its single bit) or an existing tag (contributing its
/// bits).
///
/// This is a closed union — there is no "invalid element" case to reject
/// at runtime.
#[derive(Clone)]
pub enum TagElement {
    /// A registered component; contributes its single capability bit.
    Component(Component),
    /// An existing tag; contributes its whole flag word.
    Tag(Tag),
}

impl From<&Component> for TagElement {
    fn from(component: &Component) -> Self {
        TagElement::Component(component.clone())
    }
}

impl From<Component> for TagElement {
    fn from(component: Component) -> Self {
        TagElement::Component(component)
    }
}

impl From<Tag> for TagElement {
    fn from(tag: Tag) -> Self {
        TagElement::Tag(tag)
    }
}

impl From<&Tag> for TagElement {
    fn from(tag: &Tag) -> Self {
        TagElement::Tag(*tag)
    }
}

/// Build a [`Tag`] from a mixed list of component handles and tags.
///
/// ```
/// # use tag_ecs::{build_tag, Engine};
/// let engine = Engine::new();
/// let position = engine.new_component();
/// let health = engine.new_component();
///
/// let alive = build_tag!(&position, &health);
/// assert!(alive.matches(position.tag()));
/// ```
#[macro_export]
macro_rules! build_tag {
    ($($element:expr),* $(,)?) => {
        $crate::Tag::from_elements([$($crate::TagElement::from($element)),*])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Engine;

    #[test]
    fn test_empty_tag_matches_everything() {
        assert!(Tag::EMPTY.matches(Tag::EMPTY));
        assert!(Tag::from_flags(0b1011).matches(Tag::EMPTY));
    }

    #[test]
    fn test_subset_containment() {
        let superset = Tag::from_flags(0b1110);
        let subset = Tag::from_flags(0b0110);
        let disjoint = Tag::from_flags(0b0001);

        assert!(superset.matches(subset));
        assert!(!subset.matches(superset));
        assert!(!superset.matches(disjoint));
        assert!(superset.matches(superset));
    }

    #[test]
    fn test_inverse_negates_containment() {
        let superset = Tag::from_flags(0b1110);
        let subset = Tag::from_flags(0b0110);
        let disjoint = Tag::from_flags(0b0001);

        assert!(!superset.matches(subset.inverse()));
        assert!(superset.matches(disjoint.inverse()));
        // Inversion is a property of the predicate, not the subject.
        assert!(superset.inverse().matches(subset));
    }

    #[test]
    fn test_with_inverse_false_restores_plain_tag() {
        let tag = Tag::from_flags(0b10).inverse();
        assert!(tag.is_inverse());
        assert!(!tag.with_inverse(false).is_inverse());
    }

    #[test]
    fn test_or_and_clear_round_trip() {
        let mut tag = Tag::from_bit(3);
        tag.or_in_place(Tag::from_bit(5));
        assert_eq!(tag.flags(), 0b10_1000);

        tag.clear_in_place(Tag::from_bit(3));
        assert_eq!(tag.flags(), 0b10_0000);
    }

    #[test]
    fn test_build_tag_from_components_and_tags() {
        let engine = Engine::new();
        let a = engine.new_component();
        let b = engine.new_component();
        let c = engine.new_component();

        let ab = build_tag!(&a, &b);
        assert_eq!(ab.flags(), 0b011);

        // A tag element contributes its whole flag word.
        let abc = build_tag!(ab, &c);
        assert_eq!(abc.flags(), 0b111);
        assert!(abc.matches(ab));
        assert!(!ab.matches(abc));
    }

    #[test]
    fn test_build_tag_empty_is_empty() {
        assert_eq!(build_tag!(), Tag::EMPTY);
    }
}
