//! Query Builder WHERE clause operations
//!
//! `Conditional` is shared by the query builder, the builder state and the
//! handle passed to `where_group` callbacks, so nested groups accept exactly
//! the same calls as the top level.

use super::conditions::ConditionGroup;
use super::types::{Connector, QueryOperator};
use crate::backends::DatabaseValue;
use crate::error::{QueryError, QueryResult};

/// Anything owning a condition group that WHERE predicates can be appended to
pub trait Conditional {
    /// The group new conditions are appended to
    fn condition_group(&mut self) -> &mut ConditionGroup;

    /// Add `column op value`, joined with AND
    fn and_where(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<DatabaseValue>,
    ) -> QueryResult<&mut Self> {
        push_scalar(self.condition_group(), Connector::And, column, operator, value.into())?;
        Ok(self)
    }

    /// Add `column op value`, joined with OR
    fn or_where(
        &mut self,
        column: &str,
        operator: &str,
        value: impl Into<DatabaseValue>,
    ) -> QueryResult<&mut Self> {
        push_scalar(self.condition_group(), Connector::Or, column, operator, value.into())?;
        Ok(self)
    }

    fn where_in<I, V>(&mut self, column: &str, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.condition_group()
            .add_clause(Connector::And, column, "IN", collect(values))?;
        Ok(self)
    }

    fn where_not_in<I, V>(&mut self, column: &str, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.condition_group()
            .add_clause(Connector::And, column, "NOT IN", collect(values))?;
        Ok(self)
    }

    fn or_where_in<I, V>(&mut self, column: &str, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.condition_group()
            .add_clause(Connector::Or, column, "IN", collect(values))?;
        Ok(self)
    }

    fn or_where_not_in<I, V>(&mut self, column: &str, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.condition_group()
            .add_clause(Connector::Or, column, "NOT IN", collect(values))?;
        Ok(self)
    }

    fn where_between(
        &mut self,
        column: &str,
        low: impl Into<DatabaseValue>,
        high: impl Into<DatabaseValue>,
    ) -> QueryResult<&mut Self> {
        self.condition_group().add_clause(
            Connector::And,
            column,
            "BETWEEN",
            vec![low.into(), high.into()],
        )?;
        Ok(self)
    }

    fn or_where_between(
        &mut self,
        column: &str,
        low: impl Into<DatabaseValue>,
        high: impl Into<DatabaseValue>,
    ) -> QueryResult<&mut Self> {
        self.condition_group().add_clause(
            Connector::Or,
            column,
            "BETWEEN",
            vec![low.into(), high.into()],
        )?;
        Ok(self)
    }

    /// Add a raw predicate such as `length(name) > ?`
    fn where_raw<I, V>(&mut self, expression: &str, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.condition_group()
            .add_raw(Connector::And, expression, collect(values))?;
        Ok(self)
    }

    fn or_where_raw<I, V>(&mut self, expression: &str, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<DatabaseValue>,
    {
        self.condition_group()
            .add_raw(Connector::Or, expression, collect(values))?;
        Ok(self)
    }

    /// Open a parenthesized group joined with AND
    ///
    /// ```ignore
    /// query.where_group(|group| {
    ///     group.and_where("role", "=", "admin")?.or_where("role", "=", "owner")?;
    ///     Ok(())
    /// })?;
    /// ```
    fn where_group<F>(&mut self, build: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&mut ConditionBuilder) -> QueryResult<()>,
    {
        push_group(self.condition_group(), Connector::And, build)?;
        Ok(self)
    }

    /// Open a parenthesized group joined with OR
    fn or_where_group<F>(&mut self, build: F) -> QueryResult<&mut Self>
    where
        F: FnOnce(&mut ConditionBuilder) -> QueryResult<()>,
    {
        push_group(self.condition_group(), Connector::Or, build)?;
        Ok(self)
    }
}

/// Handle passed to group callbacks
#[derive(Debug, Default)]
pub struct ConditionBuilder {
    group: ConditionGroup,
}

impl ConditionBuilder {
    pub fn new(connector: Connector) -> Self {
        Self {
            group: ConditionGroup::new(connector),
        }
    }

    pub fn into_group(self) -> ConditionGroup {
        self.group
    }
}

impl Conditional for ConditionBuilder {
    fn condition_group(&mut self) -> &mut ConditionGroup {
        &mut self.group
    }
}

fn collect<I, V>(values: I) -> Vec<DatabaseValue>
where
    I: IntoIterator<Item = V>,
    V: Into<DatabaseValue>,
{
    values.into_iter().map(Into::into).collect()
}

fn push_scalar(
    group: &mut ConditionGroup,
    connector: Connector,
    column: &str,
    operator: &str,
    value: DatabaseValue,
) -> QueryResult<()> {
    let parsed: QueryOperator = operator.parse()?;
    if !parsed.is_scalar() {
        return Err(QueryError::InvalidParameter(format!(
            "{} needs a list of values, use the dedicated where_in/where_between methods",
            parsed
        )));
    }

    group.add_clause(connector, column, operator, vec![value])
}

fn push_group<F>(group: &mut ConditionGroup, connector: Connector, build: F) -> QueryResult<()>
where
    F: FnOnce(&mut ConditionBuilder) -> QueryResult<()>,
{
    let mut builder = ConditionBuilder::new(connector);
    build(&mut builder)?;
    group.add_group(builder.into_group());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(builder: ConditionBuilder) -> (String, usize) {
        let group = builder.into_group();
        (group.render(), group.bindings().len())
    }

    #[test]
    fn test_fluent_calls_chain_on_the_same_builder() {
        let mut builder = ConditionBuilder::default();
        builder
            .and_where("name", "=", "Florent")
            .unwrap()
            .or_where("email", "like", "%flo%")
            .unwrap()
            .where_between("age", 18, 30)
            .unwrap();

        assert_eq!(
            render(builder),
            (
                "`name` = ? OR `email` LIKE ? AND `age` BETWEEN ? AND ?".to_string(),
                4
            )
        );
    }

    #[test]
    fn test_list_operators_are_rejected_by_scalar_where() {
        let mut builder = ConditionBuilder::default();
        assert!(matches!(
            builder.and_where("id", "in", 1),
            Err(QueryError::InvalidParameter(_))
        ));
        assert!(matches!(
            builder.or_where("id", "between", 1),
            Err(QueryError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_nested_group_callbacks() {
        let mut builder = ConditionBuilder::default();
        builder
            .where_group(|q| {
                q.where_not_in("stuff", [1, 2])?.or_where_group(|q| {
                    q.and_where("field", "<=", 3)?
                        .and_where("field2", "NOT LIKE", "%abc%")?;
                    Ok(())
                })?;
                Ok(())
            })
            .unwrap()
            .and_where("name", "=", "Florent")
            .unwrap();

        assert_eq!(
            render(builder),
            (
                "(`stuff` NOT IN (?, ?) OR (`field` <= ? AND `field2` NOT LIKE ?)) AND `name` = ?"
                    .to_string(),
                5
            )
        );
    }

    #[test]
    fn test_callback_errors_propagate_and_empty_groups_vanish() {
        let mut builder = ConditionBuilder::default();
        let result = builder.where_group(|q| {
            q.where_in("id", Vec::<i64>::new())?;
            Ok(())
        });
        assert!(matches!(result, Err(QueryError::EmptyValueList(_))));

        builder.or_where_group(|_| Ok(())).unwrap();
        assert_eq!(render(builder), (String::new(), 0));
    }
}
