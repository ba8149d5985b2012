//! Cache kinds and their pinned tokens.
//!
//! Every kind maps to a fixed lowercase token that ends up in live cache keys.
//! The tokens are written out by hand so renaming a variant never moves data
//! to a new namespace.

use std::fmt;
use std::str::FromStr;

use super::UnknownKindError;

/// A closed set of cache categories with stable string tokens.
pub trait CacheKind: Copy + Eq + fmt::Debug + 'static {
    /// Every variant, in declaration order.
    const ALL: &'static [Self];

    /// Human readable family name used in error messages.
    const FAMILY: &'static str;

    /// The token written into keys and tags.
    fn token(self) -> &'static str;

    /// Look a kind up by its token.
    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.token() == token)
    }
}

/// Data owned by a single user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectKind {
    OnboardingData,
    Favorites,
    Profile,
    Preferences,
    Sessions,
    MarketingEmails,
}

impl CacheKind for SubjectKind {
    const ALL: &'static [Self] = &[
        Self::OnboardingData,
        Self::Favorites,
        Self::Profile,
        Self::Preferences,
        Self::Sessions,
        Self::MarketingEmails,
    ];

    const FAMILY: &'static str = "subject";

    fn token(self) -> &'static str {
        match self {
            Self::OnboardingData => "onboardingdata",
            Self::Favorites => "favorites",
            Self::Profile => "profile",
            Self::Preferences => "preferences",
            Self::Sessions => "sessions",
            Self::MarketingEmails => "marketingemails",
        }
    }
}

/// Data owned by a study group (tenant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Member list.
    Members,
    /// A single member's detail, scoped further by member id.
    Member,
    Invitations,
    ApiKeys,
    Webhooks,
    Schedule,
    /// A single contact, scoped further by contact id.
    Contact,
    /// Lead-generation data. Cached per acting user, see
    /// [`CacheKeyRegistry::group_key_scoped_to_acting_user`](super::CacheKeyRegistry::group_key_scoped_to_acting_user).
    Leads,
    /// Page-visit counter for one item, scoped further by item id.
    PageVisits,
}

impl CacheKind for GroupKind {
    const ALL: &'static [Self] = &[
        Self::Members,
        Self::Member,
        Self::Invitations,
        Self::ApiKeys,
        Self::Webhooks,
        Self::Schedule,
        Self::Contact,
        Self::Leads,
        Self::PageVisits,
    ];

    const FAMILY: &'static str = "group";

    fn token(self) -> &'static str {
        match self {
            Self::Members => "members",
            Self::Member => "member",
            Self::Invitations => "invitations",
            Self::ApiKeys => "apikeys",
            Self::Webhooks => "webhooks",
            Self::Schedule => "schedule",
            Self::Contact => "contact",
            Self::Leads => "leads",
            Self::PageVisits => "pagevisits",
        }
    }
}

macro_rules! impl_token_traits {
    ($($kind:ty),+) => {$(
        impl fmt::Display for $kind {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.token())
            }
        }

        impl FromStr for $kind {
            type Err = UnknownKindError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_token(s).ok_or_else(|| UnknownKindError {
                    family: <$kind as CacheKind>::FAMILY,
                    token: s.to_string(),
                })
            }
        }
    )+};
}

impl_token_traits!(SubjectKind, GroupKind);

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_subject_tokens_are_pinned() {
        assert_eq!(SubjectKind::OnboardingData.token(), "onboardingdata");
        assert_eq!(SubjectKind::Favorites.token(), "favorites");
        assert_eq!(SubjectKind::Profile.token(), "profile");
        assert_eq!(SubjectKind::Preferences.token(), "preferences");
        assert_eq!(SubjectKind::Sessions.token(), "sessions");
        assert_eq!(SubjectKind::MarketingEmails.token(), "marketingemails");
    }

    #[test]
    fn test_group_tokens_are_pinned() {
        assert_eq!(GroupKind::Members.token(), "members");
        assert_eq!(GroupKind::Member.token(), "member");
        assert_eq!(GroupKind::Invitations.token(), "invitations");
        assert_eq!(GroupKind::ApiKeys.token(), "apikeys");
        assert_eq!(GroupKind::Webhooks.token(), "webhooks");
        assert_eq!(GroupKind::Schedule.token(), "schedule");
        assert_eq!(GroupKind::Contact.token(), "contact");
        assert_eq!(GroupKind::Leads.token(), "leads");
        assert_eq!(GroupKind::PageVisits.token(), "pagevisits");
    }

    #[test]
    fn test_tokens_match_lowercased_variant_names() {
        for kind in SubjectKind::ALL {
            assert_eq!(kind.token(), format!("{:?}", kind).to_lowercase());
        }
        for kind in GroupKind::ALL {
            assert_eq!(kind.token(), format!("{:?}", kind).to_lowercase());
        }
    }

    #[test]
    fn test_tokens_are_unique_within_family() {
        let subject: HashSet<_> = SubjectKind::ALL.iter().map(|k| k.token()).collect();
        assert_eq!(subject.len(), SubjectKind::ALL.len());

        let group: HashSet<_> = GroupKind::ALL.iter().map(|k| k.token()).collect();
        assert_eq!(group.len(), GroupKind::ALL.len());
    }

    #[test]
    fn test_parse_round_trips_through_display() {
        for kind in GroupKind::ALL {
            assert_eq!(kind.to_string().parse::<GroupKind>(), Ok(*kind));
        }
        assert_eq!("favorites".parse::<SubjectKind>(), Ok(SubjectKind::Favorites));
    }

    #[test]
    fn test_parse_unknown_token() {
        let err = "Favorites".parse::<SubjectKind>().unwrap_err();
        assert_eq!(err.family, "subject");
        assert_eq!(err.to_string(), "Unknown subject cache kind: Favorites");
    }
}
