//! Model factories for tests and seeding
//!
//! A factory supplies a default row for its model; overrides are merged on
//! top before the row is hydrated into a model instance.

use crate::backends::Row;
use crate::error::ModelResult;
use crate::model::Model;
use crate::query::QueryBuilder;

/// Trait for factories producing instances of one model
pub trait ModelFactory {
    type Model: Model;

    /// Default column values of a made model
    fn definition(&self) -> Row;

    /// Make one model from the definition merged with `overrides`
    fn make_one(&self, overrides: Row) -> ModelResult<Self::Model> {
        Self::Model::from_database_row(self.definition().merge(overrides))
    }

    /// Make `count` models, `overrides[i]` applying to the i-th one
    fn make_many(&self, count: usize, overrides: Vec<Row>) -> ModelResult<Vec<Self::Model>> {
        let mut overrides = overrides.into_iter();

        (0..count)
            .map(|_| self.make_one(overrides.next().unwrap_or_default()))
            .collect()
    }

    /// Make and insert one model
    fn save_one(&self, query: &mut QueryBuilder<'_>, overrides: Row) -> ModelResult<bool> {
        self.save_many(query, 1, vec![overrides])
    }

    /// Make `count` models and insert them with a single statement
    fn save_many(
        &self,
        query: &mut QueryBuilder<'_>,
        count: usize,
        overrides: Vec<Row>,
    ) -> ModelResult<bool> {
        let rows: Vec<Row> = self
            .make_many(count, overrides)?
            .iter()
            .map(|model| model.to_database_row())
            .collect();

        if rows.is_empty() {
            return Ok(false);
        }

        tracing::debug!(
            "Seeding {} row(s) into {}",
            rows.len(),
            Self::Model::table_name()
        );

        query.in_table(Self::Model::table_name()).insert_many(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hydration::{Entity, EntitySchema};
    use crate::row;

    #[derive(Debug, Default, PartialEq)]
    struct Tag {
        label: String,
        weight: i64,
    }

    impl Entity for Tag {
        fn describe(schema: &mut EntitySchema<Self>) {
            schema
                .field("label", |tag: &mut Tag, value| tag.label = value)
                .field("weight", |tag: &mut Tag, value| tag.weight = value);
        }
    }

    impl Model for Tag {
        fn to_database_row(&self) -> Row {
            row! { "label" => self.label.as_str(), "weight" => self.weight }
        }
    }

    struct TagFactory;

    impl ModelFactory for TagFactory {
        type Model = Tag;

        fn definition(&self) -> Row {
            row! { "label" => "misc", "weight" => 1 }
        }
    }

    #[test]
    fn test_make_one_merges_overrides() {
        let tag = TagFactory.make_one(row! { "weight" => 5 }).unwrap();
        assert_eq!(tag.label, "misc");
        assert_eq!(tag.weight, 5);
    }

    #[test]
    fn test_make_many_applies_overrides_by_index() {
        let tags = TagFactory
            .make_many(3, vec![row! { "label" => "first" }, Row::new()])
            .unwrap();

        let labels: Vec<&str> = tags.iter().map(|tag| tag.label.as_str()).collect();
        assert_eq!(labels, ["first", "misc", "misc"]);
        assert!(TagFactory.make_many(0, Vec::new()).unwrap().is_empty());
    }
}
