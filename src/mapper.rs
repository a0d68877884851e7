//! Component I: maps a [`Query`] AST to a single SQL statement against the
//! `Node(oid, l, d)` / `Quad(oid, m, s, p, o)` schema.
//!
//! The pattern tree is walked pre-order, allocating one table alias per
//! mandatory quad. Constants are resolved to node ids through the same
//! read-only [`Store::lookup`]/[`Store::lookup_resource`] the query executor
//! itself never writes through — a constant with no matching node maps to
//! [`NOT_FOUND`], which simply can't equal any real `oid` and so yields zero
//! rows rather than an error. Graph positions are never constrained: the
//! grammar never produces anything but `Node::Unbound` there, and named-graph
//! scoping of queries is out of scope (SPEC_FULL.md §2 Non-goals).

use crate::error::{MapperError, MappingError};
use crate::sparql::{Expr, Node, OrderCond, Pattern, Query};
use crate::store::{Store, DATATYPE_PLAIN};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    /// Statically known to hold only resources (seen in a subject/predicate
    /// position somewhere in the pattern): one result column, the IRI.
    Resource,
    /// Never seen outside an object position: two result columns, a
    /// datatype marker (NULL = resource, "" = plain, else a datatype IRI)
    /// followed by the lexical form. Mirrors the row encoding
    /// [`crate::store::Store::export_rows`] decodes on the export path.
    Literal,
}

pub struct MappedQuery {
    pub sql: String,
    pub projection: Vec<(String, ProjectionKind)>,
}

struct VarBinding {
    alias: String,
    column: char,
    resource_typed: bool,
}

struct Mapper<'s> {
    store: &'s Store,
    bindings: HashMap<String, VarBinding>,
    joins: Vec<String>,
    next_alias: usize,
}

impl<'s> Mapper<'s> {
    fn resolve(
        &mut self,
        alias: &str,
        column: char,
        node: &Node,
        is_resource_position: bool,
        conditions: &mut Vec<String>,
    ) -> Result<(), MappingError> {
        match node {
            Node::Unbound => {}
            Node::Variable(name) => {
                if let Some(existing) = self.bindings.get_mut(name) {
                    conditions.push(format!("{alias}.{column} = {}.{}", existing.alias, existing.column));
                    existing.resource_typed |= is_resource_position;
                } else {
                    self.bindings.insert(
                        name.clone(),
                        VarBinding { alias: alias.to_string(), column, resource_typed: is_resource_position },
                    );
                }
            }
            Node::Resource(iri) => {
                let id = self.store.lookup_resource(iri)?;
                conditions.push(format!("{alias}.{column} = {id}"));
            }
            Node::Literal { lexical, datatype } => {
                let datatype_id = match datatype {
                    Some(iri) => self.store.lookup_resource(iri)?,
                    None => DATATYPE_PLAIN,
                };
                let id = self.store.lookup(lexical, datatype_id)?;
                conditions.push(format!("{alias}.{column} = {id}"));
            }
        }
        Ok(())
    }

    fn walk(&mut self, pattern: &Pattern, optional: bool) -> Result<(), MappingError> {
        for quad in &pattern.mandatory_quads {
            let alias = format!("q{}", self.next_alias);
            self.next_alias += 1;

            let mut conditions = Vec::new();
            self.resolve(&alias, 's', &quad.subject, true, &mut conditions)?;
            self.resolve(&alias, 'p', &quad.predicate, true, &mut conditions)?;
            self.resolve(&alias, 'o', &quad.object, false, &mut conditions)?;

            let on_clause = if conditions.is_empty() { "1 = 1".to_string() } else { conditions.join(" AND ") };
            let join_kw = if optional { "LEFT JOIN" } else { "JOIN" };
            self.joins.push(format!("{join_kw} Quad {alias} ON {on_clause}"));
        }
        for sub in &pattern.optional {
            self.walk(sub, true)?;
        }
        Ok(())
    }

    fn select_list(&self, query: &Query) -> Result<(String, Vec<(String, ProjectionKind)>), MapperError> {
        let mut columns = Vec::new();
        let mut plan = Vec::new();
        for name in &query.projection {
            let binding = self
                .bindings
                .get(name)
                .ok_or_else(|| MapperError::UnboundVariable(name.clone()))?;
            let lexical = format!("(SELECT l FROM Node WHERE oid = {}.{})", binding.alias, binding.column);
            if binding.resource_typed {
                columns.push(format!("{lexical} AS {name}"));
                plan.push((name.clone(), ProjectionKind::Resource));
            } else {
                let datatype = format!(
                    "(SELECT CASE WHEN n.d = 0 THEN NULL WHEN n.d = 1 THEN '' ELSE dt.l END \
                      FROM Node n LEFT JOIN Node dt ON dt.oid = n.d WHERE n.oid = {}.{})",
                    binding.alias, binding.column
                );
                columns.push(format!("{datatype} AS {name}_datatype"));
                columns.push(format!("{lexical} AS {name}"));
                plan.push((name.clone(), ProjectionKind::Literal));
            }
        }
        Ok((columns.join(", "), plan))
    }

    fn render_expr(&self, expr: &Expr) -> Result<String, MapperError> {
        match expr {
            Expr::Value(Node::Variable(name)) => {
                let binding = self
                    .bindings
                    .get(name)
                    .ok_or_else(|| MapperError::UnboundVariable(name.clone()))?;
                Ok(format!("(SELECT l FROM Node WHERE oid = {}.{})", binding.alias, binding.column))
            }
            Expr::Value(_) => Err(MapperError::UnsupportedOperator("value(constant)")),
            Expr::And(..) => Err(MapperError::UnsupportedOperator("&&")),
            Expr::Or(..) => Err(MapperError::UnsupportedOperator("||")),
            Expr::Mult(..) => Err(MapperError::UnsupportedOperator("*")),
            Expr::Div(..) => Err(MapperError::UnsupportedOperator("/")),
            Expr::Plus(..) => Err(MapperError::UnsupportedOperator("+")),
            Expr::Min(..) => Err(MapperError::UnsupportedOperator("-")),
            Expr::Neg(..) => Err(MapperError::UnsupportedOperator("unary -")),
            Expr::Inv(..) => Err(MapperError::UnsupportedOperator("!")),
            Expr::Equal(..) => Err(MapperError::UnsupportedOperator("=")),
            Expr::NotEqual(..) => Err(MapperError::UnsupportedOperator("!=")),
            Expr::Greater(..) => Err(MapperError::UnsupportedOperator(">")),
            Expr::GreaterEqual(..) => Err(MapperError::UnsupportedOperator(">=")),
            Expr::Less(..) => Err(MapperError::UnsupportedOperator("<")),
            Expr::LessEqual(..) => Err(MapperError::UnsupportedOperator("<=")),
        }
    }

    fn order_by(&self, order: &[OrderCond]) -> Result<String, MapperError> {
        let mut parts = Vec::with_capacity(order.len());
        for cond in order {
            let rendered = self.render_expr(&cond.expr)?;
            parts.push(if cond.desc { format!("{rendered} DESC") } else { rendered });
        }
        Ok(parts.join(", "))
    }
}

/// Maps `query` to SQL runnable against `store`'s schema.
pub fn map(store: &Store, query: &Query) -> Result<MappedQuery, MappingError> {
    let mut mapper = Mapper { store, bindings: HashMap::new(), joins: Vec::new(), next_alias: 0 };
    mapper.walk(&query.pattern, false)?;

    let (select_list, projection) = mapper.select_list(query).map_err(MappingError::Mapper)?;
    let distinct = if query.distinct { "DISTINCT " } else { "" };

    let mut sql = format!("SELECT {distinct}{select_list} FROM (SELECT NULL)");
    for join in &mapper.joins {
        sql.push(' ');
        sql.push_str(join);
    }

    if !query.order.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&mapper.order_by(&query.order).map_err(MappingError::Mapper)?);
    }

    if query.limit >= 0 {
        sql.push_str(&format!(" LIMIT {}", query.limit));
        if query.offset >= 0 {
            sql.push_str(&format!(" OFFSET {}", query.offset));
        }
    } else if query.offset >= 0 {
        sql.push_str(&format!(" LIMIT -1 OFFSET {}", query.offset));
    }

    Ok(MappedQuery { sql, projection })
}
