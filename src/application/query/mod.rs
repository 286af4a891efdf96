//! Query processor: filter → sort → paginate over a collection snapshot.
//!
//! Pure and deterministic; the snapshot is never mutated and identical
//! parameters always produce an identical page.

mod filter;
mod params;
mod sort;

pub use filter::{Predicate, predicates};
pub use params::{ALL_SENTINEL, QueryParams, is_active_filter};
pub use sort::sort_records;

use databyte_api_types::{PageResult, Record};

use crate::{application::pagination::paginate, domain::collections::CollectionSpec};

pub fn query(snapshot: &[Record], params: &QueryParams, spec: &CollectionSpec) -> PageResult {
    let predicates = predicates(spec, params.active_filters());

    let mut selected: Vec<&Record> = snapshot
        .iter()
        .filter(|record| predicates.iter().all(|predicate| predicate.matches(record)))
        .collect();

    if let Some(comparator) = spec.comparator(params.sort.as_deref()) {
        sort_records(&mut selected, comparator);
    }

    paginate(&selected, params.page, params.limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::collections::{BLOGS, MEMBERS, PROJECTS};
    use databyte_api_types::Pagination;
    use serde_json::{Value, json};

    fn snapshot(values: Vec<Value>) -> Vec<Record> {
        values
            .into_iter()
            .map(|value| serde_json::from_value(value).unwrap())
            .collect()
    }

    fn projects() -> Vec<Record> {
        snapshot(vec![
            json!({"id": "p1", "name": "Face Attendance", "category": "cv", "status": "deployed"}),
            json!({"id": "p2", "name": "Admin Bot", "category": "nlp", "status": "deployed"}),
            json!({"id": "p3", "name": "Segmentation", "category": "Computer Vision", "status": "research"}),
            json!({"id": "p4", "name": "Pose", "category": "cv", "status": "completed"}),
            json!({"id": "p5", "name": "Depth", "category": "CV", "status": "deployed"}),
            json!({"id": "p6", "name": "Game Agent", "category": "rl", "status": "research"}),
            json!({"id": "p7", "name": "Tracker", "category": "cv", "status": "in-progress"}),
        ])
    }

    fn ids(result: &PageResult) -> Vec<&str> {
        result.data.iter().map(Record::id).collect()
    }

    #[test]
    fn category_filter_paginates_matching_subset() {
        let params = QueryParams::parse(Some("category=cv&page=1&limit=2"), PROJECTS.default_limit);
        let result = query(&projects(), &params, &PROJECTS);

        assert_eq!(ids(&result), vec!["p1", "p3"]);
        assert_eq!(
            result.pagination,
            Pagination {
                page: 1,
                limit: 2,
                total: 5,
                total_pages: 3,
                has_more: true,
            }
        );
    }

    #[test]
    fn page_beyond_range_is_empty_but_valid() {
        let items = snapshot(
            (1..=5)
                .map(|index| json!({"id": format!("p{index}"), "name": format!("n{index}")}))
                .collect(),
        );
        let params = QueryParams::parse(Some("page=4&limit=2"), PROJECTS.default_limit);
        let result = query(&items, &params, &PROJECTS);

        assert!(result.data.is_empty());
        assert_eq!(result.pagination.total, 5);
        assert_eq!(result.pagination.total_pages, 3);
        assert!(!result.pagination.has_more);
    }

    #[test]
    fn filter_order_does_not_change_results() {
        let items = projects();
        let forward = QueryParams::new(50)
            .with_filter("category", "cv")
            .with_filter("status", "deployed");

        let by_hand: Vec<&Record> = {
            let status = Predicate::new(PROJECTS.filter("status").unwrap(), "deployed");
            let category = Predicate::new(PROJECTS.filter("category").unwrap(), "cv");
            items
                .iter()
                .filter(|record| status.matches(record))
                .filter(|record| category.matches(record))
                .collect()
        };

        let result = query(&items, &forward, &PROJECTS);
        let expected: Vec<&str> = by_hand.iter().map(|record| record.id()).collect();
        assert_eq!(ids(&result), expected);
        assert_eq!(ids(&result), vec!["p1", "p5"]);
    }

    #[test]
    fn repeated_queries_are_identical() {
        let items = projects();
        let params = QueryParams::parse(Some("sort=name&limit=3&page=2"), PROJECTS.default_limit);
        assert_eq!(
            query(&items, &params, &PROJECTS),
            query(&items, &params, &PROJECTS)
        );
    }

    #[test]
    fn unknown_sort_keeps_declared_order() {
        let items = projects();
        let params = QueryParams::parse(Some("sort=stars&limit=50"), PROJECTS.default_limit);
        let result = query(&items, &params, &PROJECTS);
        assert_eq!(
            ids(&result),
            vec!["p1", "p2", "p3", "p4", "p5", "p6", "p7"]
        );
    }

    #[test]
    fn name_sort_orders_alphabetically() {
        let params = QueryParams::parse(Some("sort=name&limit=3"), PROJECTS.default_limit);
        let result = query(&projects(), &params, &PROJECTS);
        assert_eq!(ids(&result), vec!["p2", "p5", "p1"]);
    }

    #[test]
    fn members_domain_alias_matches_spelled_out_value() {
        let members = snapshot(vec![
            json!({"id": "m1", "domain": "Computer Vision", "batch": "2028"}),
            json!({"id": "m2", "domain": "Web Development", "batch": "2027"}),
            json!({"id": "m3", "domain": "computer vision, NLP", "batch": "2027"}),
        ]);
        let params = QueryParams::parse(Some("domain=cv"), MEMBERS.default_limit);
        let result = query(&members, &params, &MEMBERS);
        assert_eq!(ids(&result), vec!["m1", "m3"]);

        let params = QueryParams::parse(Some("domain=cv&batch=2027"), MEMBERS.default_limit);
        assert_eq!(ids(&query(&members, &params, &MEMBERS)), vec!["m3"]);
    }

    #[test]
    fn blogs_default_to_newest_first() {
        let blogs = snapshot(vec![
            json!({"id": "b1", "date": "2024-02-05"}),
            json!({"id": "b2", "date": "2024-02-10"}),
            json!({"id": "b3", "date": "2024-02-08"}),
        ]);
        let default = QueryParams::parse(None, BLOGS.default_limit);
        assert_eq!(ids(&query(&blogs, &default, &BLOGS)), vec!["b2", "b3", "b1"]);

        let oldest = QueryParams::parse(Some("sort=oldest"), BLOGS.default_limit);
        assert_eq!(ids(&query(&blogs, &oldest, &BLOGS)), vec!["b1", "b3", "b2"]);
    }
}
