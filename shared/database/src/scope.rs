//! Translation of access scopes into MongoDB filters.
//!
//! The pure visibility rules live in `abportal_models::AccessScope`; this
//! module maps a scope onto a concrete collection's field names. Repositories
//! declare which fields carry ownership and country tags, and get back the
//! filter to hand to the driver. `None` means the scope reaches nothing and
//! the caller should skip the query entirely.

use abportal_models::{AccessScope, CatalogScope};
use mongodb::bson::{doc, Bson, Document};

/// Field names a collection uses for ownership and country tagging.
#[derive(Debug, Clone, Copy)]
pub struct OwnedFields {
    /// Field holding the authoring agency email.
    pub agency: &'static str,
    /// Field naming an assigned sub-agent, when the collection has one.
    pub sub_agent: Option<&'static str>,
    /// Field carrying the record's country tag, when the collection has one.
    pub country: Option<&'static str>,
}

/// Build the filter an [`AccessScope`] imposes on an owned collection.
///
/// Country filters also match records without the tag: a country admin keeps
/// seeing untagged records. Agency filters match records authored by any of
/// the caller's identities, or records listing the caller as sub-agent.
pub fn owned_filter(scope: &AccessScope, fields: OwnedFields) -> Option<Document> {
    match scope {
        AccessScope::All => Some(Document::new()),
        AccessScope::Country(country) => Some(match fields.country {
            Some(field) => doc! {"$or": [{field: country}, {field: Bson::Null}]},
            None => Document::new(),
        }),
        AccessScope::Agency { authors, member } => {
            let mut branches = vec![doc! {fields.agency: {"$in": authors}}];
            if let Some(field) = fields.sub_agent {
                branches.push(doc! {field: member});
            }
            Some(doc! {"$or": branches})
        }
        AccessScope::Denied => None,
    }
}

/// Build the filter a [`CatalogScope`] imposes on a catalog collection.
pub fn catalog_filter(scope: &CatalogScope, country_field: &str) -> Document {
    match scope {
        CatalogScope::All => Document::new(),
        CatalogScope::Country(country) => {
            doc! {"$or": [{country_field: country}, {country_field: Bson::Null}]}
        }
    }
}

/// AND together several filters, dropping empty ones.
pub fn and_all(filters: Vec<Document>) -> Document {
    let mut non_empty: Vec<Document> = filters.into_iter().filter(|f| !f.is_empty()).collect();
    if non_empty.is_empty() {
        return Document::new();
    }
    if non_empty.len() == 1 {
        return non_empty.remove(0);
    }
    doc! {"$and": non_empty}
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEAD_FIELDS: OwnedFields = OwnedFields {
        agency: "agency",
        sub_agent: Some("sub_agent"),
        country: Some("destination_country"),
    };

    #[test]
    fn all_scope_builds_empty_filter() {
        let filter = owned_filter(&AccessScope::All, LEAD_FIELDS).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn denied_scope_builds_no_filter() {
        assert!(owned_filter(&AccessScope::Denied, LEAD_FIELDS).is_none());
    }

    #[test]
    fn agency_scope_matches_authors_or_membership() {
        let scope = AccessScope::Agency {
            authors: vec![
                "head@agency.example".to_string(),
                "junior@agency.example".to_string(),
            ],
            member: "head@agency.example".to_string(),
        };
        let filter = owned_filter(&scope, LEAD_FIELDS).unwrap();

        let expected = doc! {"$or": [
            {"agency": {"$in": ["head@agency.example", "junior@agency.example"]}},
            {"sub_agent": "head@agency.example"},
        ]};
        assert_eq!(filter, expected);
    }

    #[test]
    fn agency_scope_without_sub_agent_field_has_single_branch() {
        let fields = OwnedFields {
            agency: "created_by",
            sub_agent: None,
            country: None,
        };
        let scope = AccessScope::Agency {
            authors: vec!["head@agency.example".to_string()],
            member: "head@agency.example".to_string(),
        };
        let filter = owned_filter(&scope, fields).unwrap();

        let expected = doc! {"$or": [
            {"created_by": {"$in": ["head@agency.example"]}},
        ]};
        assert_eq!(filter, expected);
    }

    #[test]
    fn country_scope_admits_untagged_records() {
        let filter = owned_filter(&AccessScope::Country("AU".to_string()), LEAD_FIELDS).unwrap();
        let expected = doc! {"$or": [
            {"destination_country": "AU"},
            {"destination_country": Bson::Null},
        ]};
        assert_eq!(filter, expected);
    }

    #[test]
    fn country_scope_on_untagged_collection_is_unfiltered() {
        let fields = OwnedFields {
            agency: "agency",
            sub_agent: Some("sub_agent"),
            country: None,
        };
        let filter = owned_filter(&AccessScope::Country("AU".to_string()), fields).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn catalog_country_filter_admits_untagged_records() {
        let filter = catalog_filter(&CatalogScope::Country("AU".to_string()), "country");
        let expected = doc! {"$or": [{"country": "AU"}, {"country": Bson::Null}]};
        assert_eq!(filter, expected);
    }

    #[test]
    fn and_all_collapses_trivial_cases() {
        assert!(and_all(vec![]).is_empty());
        assert!(and_all(vec![Document::new(), Document::new()]).is_empty());

        let single = and_all(vec![doc! {"status": "new"}, Document::new()]);
        assert_eq!(single, doc! {"status": "new"});

        let both = and_all(vec![doc! {"status": "new"}, doc! {"agency": "a@x.example"}]);
        assert_eq!(
            both,
            doc! {"$and": [{"status": "new"}, {"agency": "a@x.example"}]}
        );
    }
}
