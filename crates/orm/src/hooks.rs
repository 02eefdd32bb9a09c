//! # Hooks
//!
//! Per-action transforms run by the DAO around statement execution. A
//! [`Hooks`] value is assembled once and handed to the DAO; it is never
//! mutated afterwards.
//!
//! ```rust,ignore
//! let hooks = Hooks::default()
//!     .before_validated(Action::Insert, |_, mut items| {
//!         for item in &mut items {
//!             item.set("created_at", FieldValue::Value(Utc::now().into()));
//!         }
//!         Ok(items)
//!     })
//!     .after(Action::Delete, |ctx, outcome| {
//!         tracing::info!(table = ctx.entity.table(), ?outcome, "deleted");
//!         Ok(())
//!     });
//! ```

use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::sync::Arc;

use tabula_sql::Row;

use crate::entity::EntityDescriptor;
use crate::error::{Action, Error, Result, Violation};
use crate::params::EntityParameter;
use crate::value::{Operator, is_null};

/// What a hook is running for.
#[derive(Clone, Copy, Debug)]
pub struct HookContext<'a> {
    /// The entity being accessed.
    pub entity: &'a EntityDescriptor,

    /// The DAO action.
    pub action: Action,

    /// Key column of the call: the update key, otherwise the identifier.
    pub key: &'a str,
}

/// Result of an executed action, as seen by after hooks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome<'a> {
    /// Rows returned by a find.
    Rows(&'a [Row]),
    /// Rows affected by a mutation.
    Affected(u32),
}

/// Transform applied to entity parameters before compilation.
pub type BeforeHook =
    Arc<dyn Fn(&HookContext<'_>, Vec<EntityParameter>) -> Result<Vec<EntityParameter>> + Send + Sync>;

/// Side effect run on the result of an action.
pub type AfterHook = Arc<dyn Fn(&HookContext<'_>, &Outcome<'_>) -> Result<()> + Send + Sync>;

#[derive(Clone)]
enum Before {
    Replace(BeforeHook),
    Validated(BeforeHook),
}

/// Before and after hooks keyed by action.
///
/// Actions without a before hook run [`default_before`].
#[derive(Clone, Default)]
pub struct Hooks {
    before: HashMap<Action, Before>,
    after: HashMap<Action, AfterHook>,
}

impl Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("before", &self.before.keys().collect::<Vec<_>>())
            .field("after", &self.after.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Hooks {
    /// Replace the default before hook for `action`.
    #[must_use]
    pub fn before<F>(mut self, action: Action, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>, Vec<EntityParameter>) -> Result<Vec<EntityParameter>>
            + Send
            + Sync
            + 'static,
    {
        self.before.insert(action, Before::Replace(Arc::new(hook)));
        self
    }

    /// Run `hook` after the default before hook for `action`.
    #[must_use]
    pub fn before_validated<F>(mut self, action: Action, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>, Vec<EntityParameter>) -> Result<Vec<EntityParameter>>
            + Send
            + Sync
            + 'static,
    {
        self.before.insert(action, Before::Validated(Arc::new(hook)));
        self
    }

    /// Install an after hook for `action`.
    #[must_use]
    pub fn after<F>(mut self, action: Action, hook: F) -> Self
    where
        F: Fn(&HookContext<'_>, &Outcome<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.after.insert(action, Arc::new(hook));
        self
    }

    /// Run the before phase for `ctx.action`.
    ///
    /// # Errors
    ///
    /// Returns whatever the hook returns.
    pub fn run_before(
        &self, ctx: &HookContext<'_>, items: Vec<EntityParameter>,
    ) -> Result<Vec<EntityParameter>> {
        match self.before.get(&ctx.action) {
            None => default_before(ctx, items),
            Some(Before::Replace(hook)) => hook(ctx, items),
            Some(Before::Validated(hook)) => hook(ctx, default_before(ctx, items)?),
        }
    }

    /// Run the after phase for `ctx.action`.
    ///
    /// # Errors
    ///
    /// Returns whatever the hook returns.
    pub fn run_after(&self, ctx: &HookContext<'_>, outcome: &Outcome<'_>) -> Result<()> {
        self.after.get(&ctx.action).map_or(Ok(()), |hook| hook(ctx, outcome))
    }
}

/// The default before hook.
///
/// Drops raw `NULL` fields and items left empty, requires the key column for
/// updates and deletes, then validates every remaining field against its
/// column. All violations are collected into one
/// [`Error::ValidationFailed`].
///
/// # Errors
///
/// Returns [`Error::MissingRequiredColumn`] or [`Error::ValidationFailed`].
pub fn default_before(
    ctx: &HookContext<'_>, mut items: Vec<EntityParameter>,
) -> Result<Vec<EntityParameter>> {
    for item in &mut items {
        item.retain(|_, value| !value.is_raw_null());
    }
    items.retain(|item| !item.is_empty());

    if matches!(ctx.action, Action::Update | Action::Delete)
        && items.iter().any(|item| item.get(ctx.key).is_none())
    {
        return Err(Error::MissingRequiredColumn {
            table: ctx.entity.table().to_string(),
            action: ctx.action,
            column: ctx.key.to_string(),
        });
    }

    let check_nulls = matches!(ctx.action, Action::Insert | Action::Update);
    let mut violations = Vec::new();

    for (i, item) in items.iter().enumerate() {
        for (name, value) in item.iter() {
            let Some(column) = ctx.entity.column(name) else {
                continue;
            };
            let typed = value.parts().0 != Operator::Like;

            for element in value.values() {
                if !check_nulls && is_null(element) {
                    continue;
                }
                if let Err(message) = column.validate(element, typed) {
                    violations.push(Violation {
                        item: i,
                        field: name.to_string(),
                        message,
                    });
                    break;
                }
            }
        }
    }

    if !violations.is_empty() {
        return Err(Error::ValidationFailed {
            table: ctx.entity.table().to_string(),
            action: ctx.action,
            violations,
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use tabula_sql::SqlType;

    use super::*;
    use crate::entity::ColumnDef;
    use crate::value::{FieldQuery, FieldValue, null};

    fn entity() -> EntityDescriptor {
        EntityDescriptor::builder("user")
            .table("users")
            .column(ColumnDef::new("id", SqlType::Int))
            .column(ColumnDef::new("name", SqlType::NVarChar).max_length(5))
            .column(ColumnDef::new("age", SqlType::Int).nullable())
            .build()
    }

    fn ctx(entity: &EntityDescriptor, action: Action) -> HookContext<'_> {
        HookContext {
            entity,
            action,
            key: "id",
        }
    }

    #[test]
    fn drops_nulls_and_empty_items() {
        let entity = entity();
        let items = vec![
            EntityParameter::new().with("name", "a").with("age", null()),
            EntityParameter::new().with("age", null()),
        ];
        let items = default_before(&ctx(&entity, Action::Find), items).unwrap();
        assert_eq!(items, vec![EntityParameter::new().with("name", "a")]);
    }

    #[test]
    fn requires_key_for_mutations() {
        let entity = entity();
        let items = vec![EntityParameter::new().with("name", "a")];
        let err = default_before(&ctx(&entity, Action::Delete), items.clone()).unwrap_err();
        assert!(matches!(err, Error::MissingRequiredColumn { .. }));

        default_before(&ctx(&entity, Action::Insert), items).unwrap();
    }

    #[test]
    fn aggregates_violations() {
        let entity = entity();
        let items = vec![
            EntityParameter::new().with("name", "far too long"),
            EntityParameter::new().with("name", "ok").with_all("age", ["1", "x", "y"]),
        ];
        let Err(Error::ValidationFailed { violations, .. }) =
            default_before(&ctx(&entity, Action::Insert), items)
        else {
            panic!("expected validation failure");
        };
        assert_eq!(violations.len(), 2);
        assert_eq!((violations[0].item, violations[0].field.as_str()), (0, "name"));
        assert_eq!((violations[1].item, violations[1].field.as_str()), (1, "age"));
    }

    #[test]
    fn like_operands_skip_type_checks() {
        let entity = entity();
        let items =
            vec![EntityParameter::new().with_query("name", FieldQuery::like("%longer than five%"))];
        default_before(&ctx(&entity, Action::Find), items).unwrap();

        // explicit null match is kept for finds
        let items = vec![EntityParameter::new().with_query("name", FieldQuery::eq(null()))];
        let items = default_before(&ctx(&entity, Action::Find), items).unwrap();
        assert!(matches!(items[0].get("name"), Some(FieldValue::Query(_))));
    }

    #[test]
    fn hook_composition() {
        let entity = entity();
        let ctx = ctx(&entity, Action::Insert);

        let replaced = Hooks::default().before(Action::Insert, |_, items| Ok(items));
        let items = vec![EntityParameter::new().with("name", "far too long")];
        assert_eq!(replaced.run_before(&ctx, items.clone()).unwrap(), items);

        let validated = Hooks::default().before_validated(Action::Insert, |_, mut items| {
            for item in &mut items {
                item.set("age", FieldValue::Value(30.into()));
            }
            Ok(items)
        });
        validated.run_before(&ctx, items).unwrap_err();

        let items = vec![EntityParameter::new().with("name", "bo")];
        let items = validated.run_before(&ctx, items).unwrap();
        assert_eq!(items[0].get("age"), Some(&FieldValue::Value(30.into())));
    }
}
