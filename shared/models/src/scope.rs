//! Role-scoped access rules for portal records.
//!
//! Every list page in the portal answers the same question: which slice of a
//! collection may this caller see? The answer is resolved once per request
//! into an [`AccessScope`] and each repository maps it onto its own field
//! names. Admins see everything, or only records matching their own country
//! when their profile carries one; agents see what they or their registered
//! sub-agents authored plus records naming them as sub-agent; students are
//! refused outright.

use crate::{Profile, Role};

/// The resolved identity a request acts as.
#[derive(Debug, Clone)]
pub struct Caller {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub country: Option<String>,
    pub sub_agents: Vec<String>,
}

impl Caller {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            email: profile.email.clone(),
            name: profile.name.clone(),
            role: profile.role,
            country: profile.country.clone(),
            sub_agents: profile.sub_agents.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Scope applied to owned records: leads, quotations, payments, tracks
    /// and campaign forms.
    pub fn scope(&self) -> AccessScope {
        match self.role {
            Role::Admin => match &self.country {
                Some(country) => AccessScope::Country(country.clone()),
                None => AccessScope::All,
            },
            Role::Agent => {
                let mut authors = vec![self.email.clone()];
                authors.extend(self.sub_agents.iter().cloned());
                AccessScope::Agency {
                    authors,
                    member: self.email.clone(),
                }
            }
            Role::SubAgent => AccessScope::Agency {
                authors: vec![self.email.clone()],
                member: self.email.clone(),
            },
            Role::Student => AccessScope::Denied,
        }
    }

    /// Scope applied to catalog records (courses, promotions, resources):
    /// country-tagged entries are only shown to callers of that country,
    /// untagged entries to everyone. Students get `None`.
    pub fn catalog_scope(&self) -> Option<CatalogScope> {
        if self.role == Role::Student {
            return None;
        }
        Some(match &self.country {
            Some(country) => CatalogScope::Country(country.clone()),
            None => CatalogScope::All,
        })
    }

    /// Whether the caller may create or change a record owned by `agency`.
    /// Admins always may; agents only within their own agency chain.
    pub fn can_modify(&self, agency: &str, sub_agent: Option<&str>) -> bool {
        if self.is_admin() {
            return true;
        }
        self.scope().permits(agency, sub_agent, None)
    }
}

/// Visibility slice for owned records.
#[derive(Debug, Clone, PartialEq)]
pub enum AccessScope {
    /// Unscoped admin: the whole collection.
    All,
    /// Country-scoped admin: records of that country. Records without a
    /// country field stay visible.
    Country(String),
    /// Agent or sub-agent: records authored by any of `authors`, or records
    /// listing `member` as sub-agent.
    Agency { authors: Vec<String>, member: String },
    /// Students: nothing.
    Denied,
}

impl AccessScope {
    pub fn is_denied(&self) -> bool {
        matches!(self, AccessScope::Denied)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccessScope::All | AccessScope::Country(_))
    }

    /// Pure form of the repository filters: does this scope reach a record
    /// with the given ownership fields? Repositories build the equivalent
    /// MongoDB filter; this predicate is what the tests pin down.
    pub fn permits(&self, agency: &str, sub_agent: Option<&str>, country: Option<&str>) -> bool {
        match self {
            AccessScope::All => true,
            AccessScope::Country(scope_country) => {
                country.map_or(true, |c| c == scope_country)
            }
            AccessScope::Agency { authors, member } => {
                authors.iter().any(|a| a == agency)
                    || sub_agent.map_or(false, |s| s == member)
            }
            AccessScope::Denied => false,
        }
    }
}

/// Visibility slice for catalog records.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogScope {
    All,
    Country(String),
}

impl CatalogScope {
    pub fn permits(&self, record_country: Option<&str>) -> bool {
        match self {
            CatalogScope::All => true,
            CatalogScope::Country(country) => record_country.map_or(true, |c| c == country),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProfileStatus;
    use proptest::option;
    use proptest::prelude::*;

    fn caller(role: Role) -> Caller {
        Caller {
            email: "head@agency.example".to_string(),
            name: "Head Agent".to_string(),
            role,
            country: None,
            sub_agents: vec!["junior@agency.example".to_string()],
        }
    }

    #[test]
    fn admin_without_country_sees_everything() {
        let scope = caller(Role::Admin).scope();
        assert_eq!(scope, AccessScope::All);
        assert!(scope.permits("anyone@x.example", None, Some("AU")));
    }

    #[test]
    fn admin_with_country_is_scoped_to_it() {
        let mut admin = caller(Role::Admin);
        admin.country = Some("AU".to_string());
        let scope = admin.scope();

        assert!(scope.permits("a@x.example", None, Some("AU")));
        assert!(!scope.permits("a@x.example", None, Some("NZ")));
        // Records without a country stay visible to country admins.
        assert!(scope.permits("a@x.example", None, None));
    }

    #[test]
    fn agent_sees_own_and_team_authored_records() {
        let scope = caller(Role::Agent).scope();

        assert!(scope.permits("head@agency.example", None, None));
        assert!(scope.permits("junior@agency.example", None, None));
        assert!(!scope.permits("rival@other.example", None, None));
    }

    #[test]
    fn agent_sees_records_listing_them_as_sub_agent() {
        let scope = caller(Role::Agent).scope();
        assert!(scope.permits("rival@other.example", Some("head@agency.example"), None));
        assert!(!scope.permits("rival@other.example", Some("someone@else.example"), None));
    }

    #[test]
    fn sub_agent_has_no_team_expansion() {
        let scope = caller(Role::SubAgent).scope();
        assert!(scope.permits("head@agency.example", None, None));
        // sub_agents on the profile do not widen a sub-agent's view
        assert!(!scope.permits("junior@agency.example", None, None));
    }

    #[test]
    fn students_are_denied() {
        let scope = caller(Role::Student).scope();
        assert!(scope.is_denied());
        assert!(!scope.permits("head@agency.example", None, None));
        assert!(caller(Role::Student).catalog_scope().is_none());
    }

    #[test]
    fn caller_from_profile_carries_identity() {
        let mut profile = Profile::new(
            "Head Agent".to_string(),
            "Head@Agency.example".to_string(),
            Role::Agent,
        );
        profile.status = ProfileStatus::Active;
        profile.add_sub_agent("Junior@Agency.example");

        let caller = Caller::from_profile(&profile);
        assert_eq!(caller.email, "head@agency.example");
        assert_eq!(caller.sub_agents, vec!["junior@agency.example".to_string()]);
    }

    #[test]
    fn catalog_scope_hides_foreign_country_entries() {
        let mut agent = caller(Role::Agent);
        agent.country = Some("AU".to_string());
        let scope = agent.catalog_scope().unwrap();

        assert!(scope.permits(Some("AU")));
        assert!(scope.permits(None));
        assert!(!scope.permits(Some("NZ")));
    }

    prop_compose! {
        fn arb_email()(local in "[a-z]{3,8}", domain in "[a-z]{3,8}") -> String {
            format!("{}@{}.example", local, domain)
        }
    }

    prop_compose! {
        fn arb_record()(
            agency in arb_email(),
            sub_agent in option::of(arb_email()),
            country in option::of("[A-Z]{2}"),
        ) -> (String, Option<String>, Option<String>) {
            (agency, sub_agent, country)
        }
    }

    proptest! {
        /// Role filters exclude out-of-scope records: an agency scope never
        /// reaches a record unless the record's agency chain names one of
        /// the caller's identities.
        #[test]
        fn agency_scope_excludes_unrelated_records(
            caller_email in arb_email(),
            team in prop::collection::vec(arb_email(), 0..3),
            (agency, sub_agent, country) in arb_record(),
        ) {
            let mut authors = vec![caller_email.clone()];
            authors.extend(team.iter().cloned());
            let scope = AccessScope::Agency {
                authors: authors.clone(),
                member: caller_email.clone(),
            };

            let reachable = authors.contains(&agency)
                || sub_agent.as_deref() == Some(caller_email.as_str());
            prop_assert_eq!(
                scope.permits(&agency, sub_agent.as_deref(), country.as_deref()),
                reachable
            );
        }

        /// A denied scope permits nothing, whatever the record looks like.
        #[test]
        fn denied_scope_permits_nothing((agency, sub_agent, country) in arb_record()) {
            prop_assert!(!AccessScope::Denied.permits(
                &agency,
                sub_agent.as_deref(),
                country.as_deref(),
            ));
        }

        /// Country scoping admits exactly matching-or-untagged records.
        #[test]
        fn country_scope_matches_only_that_country(
            scope_country in "[A-Z]{2}",
            (agency, sub_agent, country) in arb_record(),
        ) {
            let scope = AccessScope::Country(scope_country.clone());
            let expected = country.as_deref().map_or(true, |c| c == scope_country);
            prop_assert_eq!(
                scope.permits(&agency, sub_agent.as_deref(), country.as_deref()),
                expected
            );
        }
    }
}
