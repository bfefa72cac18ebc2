//! Condition tree for WHERE predicates
//!
//! A tree of clauses and nested groups, each carrying the connector that joins
//! it to its previous sibling. Every clause keeps the values bound to its own
//! placeholders, so walking the tree in order yields the bindings in the order
//! their `?` appear in the rendered SQL.

use super::sql_generation::quote_identifier;
use super::types::{Connector, QueryOperator};
use crate::backends::DatabaseValue;
use crate::error::{QueryError, QueryResult};

/// A single rendered predicate such as `` `name` = ? ``
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionClause {
    pub connector: Connector,
    pub expression: String,
    pub bindings: Vec<DatabaseValue>,
}

/// Ordered sequence of clauses and nested groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionGroup {
    pub connector: Connector,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Clause(ConditionClause),
    Group(ConditionGroup),
}

impl Condition {
    pub fn connector(&self) -> Connector {
        match self {
            Condition::Clause(clause) => clause.connector,
            Condition::Group(group) => group.connector,
        }
    }
}

impl ConditionGroup {
    pub fn new(connector: Connector) -> Self {
        Self {
            connector,
            conditions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }

    /// Append `column op placeholders`, checking the operator and its arity
    pub fn add_clause(
        &mut self,
        connector: Connector,
        column: &str,
        operator: &str,
        values: Vec<DatabaseValue>,
    ) -> QueryResult<()> {
        let operator: QueryOperator = operator.parse()?;

        let placeholders = match operator {
            QueryOperator::In | QueryOperator::NotIn => {
                if values.is_empty() {
                    return Err(QueryError::EmptyValueList(column.to_string()));
                }
                format!("({})", vec!["?"; values.len()].join(", "))
            }
            QueryOperator::Between => {
                if values.len() != 2 {
                    return Err(QueryError::InvalidParameter(format!(
                        "BETWEEN on '{}' expects exactly 2 values, got {}",
                        column,
                        values.len()
                    )));
                }
                "? AND ?".to_string()
            }
            _ => {
                if values.len() != 1 {
                    return Err(QueryError::InvalidParameter(format!(
                        "{} on '{}' expects a single value, got {}",
                        operator,
                        column,
                        values.len()
                    )));
                }
                "?".to_string()
            }
        };

        self.conditions.push(Condition::Clause(ConditionClause {
            connector,
            expression: format!("{} {} {}", quote_identifier(column), operator, placeholders),
            bindings: values,
        }));

        Ok(())
    }

    /// Append a raw predicate; its `?` count must match the values
    ///
    /// A `?` inside a quoted literal or identifier is not a placeholder.
    pub fn add_raw(
        &mut self,
        connector: Connector,
        expression: &str,
        values: Vec<DatabaseValue>,
    ) -> QueryResult<()> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(QueryError::InvalidParameter(
                "raw condition cannot be empty".to_string(),
            ));
        }

        let placeholders = count_placeholders(expression);
        if placeholders != values.len() {
            return Err(QueryError::InvalidParameter(format!(
                "raw condition '{}' has {} placeholders but {} values",
                expression,
                placeholders,
                values.len()
            )));
        }

        self.conditions.push(Condition::Clause(ConditionClause {
            connector,
            expression: expression.to_string(),
            bindings: values,
        }));

        Ok(())
    }

    /// Append a nested group. Empty groups are dropped and `false` is returned.
    pub fn add_group(&mut self, group: ConditionGroup) -> bool {
        if group.is_empty() {
            tracing::warn!("Ignoring empty condition group");
            return false;
        }

        self.conditions.push(Condition::Group(group));
        true
    }

    /// Render as the body of a WHERE clause; empty groups render as ""
    pub fn render(&self) -> String {
        self.render_level(true)
    }

    fn render_level(&self, root: bool) -> String {
        if self.is_empty() {
            return String::new();
        }

        let mut sql = String::new();
        for (index, condition) in self.conditions.iter().enumerate() {
            if index > 0 {
                sql.push(' ');
                sql.push_str(&condition.connector().to_string());
                sql.push(' ');
            }

            match condition {
                Condition::Clause(clause) => sql.push_str(&clause.expression),
                Condition::Group(group) => sql.push_str(&group.render_level(false)),
            }
        }

        if root {
            sql
        } else {
            format!("({})", sql)
        }
    }

    /// Bound values in placeholder order
    pub fn bindings(&self) -> Vec<DatabaseValue> {
        let mut bindings = Vec::new();
        self.collect_bindings(&mut bindings);
        bindings
    }

    pub(crate) fn collect_bindings(&self, out: &mut Vec<DatabaseValue>) {
        for condition in &self.conditions {
            match condition {
                Condition::Clause(clause) => out.extend(clause.bindings.iter().cloned()),
                Condition::Group(group) => group.collect_bindings(out),
            }
        }
    }
}

/// Count `?` outside of `'...'`, `"..."` and `` `...` `` sections
fn count_placeholders(expression: &str) -> usize {
    let mut quote = None;
    let mut count = 0;

    for c in expression.chars() {
        match (quote, c) {
            (Some(open), c) if c == open => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '?') => count += 1,
            (None, _) => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values<const N: usize>(raw: [i64; N]) -> Vec<DatabaseValue> {
        raw.into_iter().map(DatabaseValue::from).collect()
    }

    #[test]
    fn test_empty_group_renders_nothing() {
        assert_eq!(ConditionGroup::default().render(), "");
    }

    #[test]
    fn test_first_connector_is_never_emitted() {
        let mut group = ConditionGroup::default();
        group.add_clause(Connector::Or, "a", "=", values([1])).unwrap();
        group.add_clause(Connector::Or, "b", "=", values([2])).unwrap();
        group.add_clause(Connector::And, "c", "=", values([3])).unwrap();

        assert_eq!(group.render(), "`a` = ? OR `b` = ? AND `c` = ?");
        assert_eq!(group.bindings(), values([1, 2, 3]));
    }

    #[test]
    fn test_nested_groups_are_parenthesized() {
        let mut inner = ConditionGroup::new(Connector::Or);
        inner.add_clause(Connector::And, "field", "<=", values([3])).unwrap();
        inner
            .add_clause(Connector::And, "field2", "not like", vec!["%x".into()])
            .unwrap();

        let mut outer = ConditionGroup::new(Connector::And);
        outer.add_clause(Connector::And, "stuff", "NOT IN", values([1, 2])).unwrap();
        outer.add_group(inner);

        let mut root = ConditionGroup::default();
        root.add_group(outer);
        root.add_clause(Connector::And, "name", "=", vec!["Florent".into()])
            .unwrap();

        assert_eq!(
            root.render(),
            "(`stuff` NOT IN (?, ?) OR (`field` <= ? AND `field2` NOT LIKE ?)) AND `name` = ?"
        );
        assert_eq!(root.bindings().len(), 5);
        assert_eq!(root.bindings()[4], DatabaseValue::from("Florent"));
    }

    #[test]
    fn test_arity_is_checked_when_building() {
        let mut group = ConditionGroup::default();

        assert_eq!(
            group.add_clause(Connector::And, "stuff", "IN", vec![]),
            Err(QueryError::EmptyValueList("stuff".to_string()))
        );
        assert!(matches!(
            group.add_clause(Connector::And, "at", "BETWEEN", values([1])),
            Err(QueryError::InvalidParameter(_))
        ));
        assert!(matches!(
            group.add_clause(Connector::And, "at", "=", values([1, 2])),
            Err(QueryError::InvalidParameter(_))
        ));
        assert!(matches!(
            group.add_clause(Connector::And, "at", "<>", values([1])),
            Err(QueryError::InvalidOperator(_))
        ));
        assert!(group.is_empty());
    }

    #[test]
    fn test_between_and_dotted_columns() {
        let mut group = ConditionGroup::default();
        group
            .add_clause(Connector::And, "t.created_at", "between", values([1, 2]))
            .unwrap();

        assert_eq!(group.render(), "`t`.`created_at` BETWEEN ? AND ?");
    }

    #[test]
    fn test_raw_placeholder_count_must_match() {
        let mut group = ConditionGroup::default();
        group
            .add_raw(Connector::And, "length(name) > ?", values([3]))
            .unwrap();
        assert!(matches!(
            group.add_raw(Connector::Or, "a = ? OR b = ?", values([1])),
            Err(QueryError::InvalidParameter(_))
        ));

        assert_eq!(group.render(), "length(name) > ?");
    }

    #[test]
    fn test_quoted_question_marks_are_not_placeholders() {
        let mut group = ConditionGroup::default();
        group
            .add_raw(Connector::And, "name = '?' OR id = ?", values([1]))
            .unwrap();
        group
            .add_raw(Connector::And, "`odd?col` = \"what?\" AND note = 'it''s ?'", Vec::new())
            .unwrap();

        assert_eq!(group.bindings().len(), 1);
        assert!(matches!(
            group.add_raw(Connector::And, "label = '?'", values([1])),
            Err(QueryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_empty_nested_group_is_dropped() {
        let mut group = ConditionGroup::default();
        assert!(!group.add_group(ConditionGroup::new(Connector::Or)));
        assert!(group.is_empty());
    }
}
