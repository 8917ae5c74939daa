/// Fluent query builders translating to `google.datastore.v1.Query`.
use crate::convert;
use bytes::Bytes;
use dstore_core::{Key, Value};
use dstore_proto as proto;

/// A query predicate on a single property or a combination of predicates.
///
/// Filters are combined with [`Filter::and`] or by calling
/// [`Query::filter`] repeatedly; repeated filters are AND-composed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    inner: proto::Filter,
}

impl Filter {
    fn property(
        name: impl Into<String>,
        op: proto::property_filter::Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            inner: proto::Filter {
                filter_type: Some(proto::filter::FilterType::PropertyFilter(
                    proto::PropertyFilter {
                        property: Some(proto::PropertyReference { name: name.into() }),
                        op: op as i32,
                        value: Some(convert::value_to_proto(&value.into())),
                    },
                )),
            },
        }
    }

    /// Property equals value.
    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, proto::property_filter::Operator::Equal, value)
    }

    /// Property does not equal value.
    pub fn ne(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, proto::property_filter::Operator::NotEqual, value)
    }

    /// Property is less than value.
    pub fn lt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, proto::property_filter::Operator::LessThan, value)
    }

    /// Property is less than or equal to value.
    pub fn le(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, proto::property_filter::Operator::LessThanOrEqual, value)
    }

    /// Property is greater than value.
    pub fn gt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(name, proto::property_filter::Operator::GreaterThan, value)
    }

    /// Property is greater than or equal to value.
    pub fn ge(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::property(
            name,
            proto::property_filter::Operator::GreaterThanOrEqual,
            value,
        )
    }

    /// Property equals any of the given values.
    pub fn in_list(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self::property(name, proto::property_filter::Operator::In, values)
    }

    /// The entity's key has `ancestor` on its path.
    pub fn has_ancestor(ancestor: &Key) -> Self {
        Self {
            inner: proto::Filter {
                filter_type: Some(proto::filter::FilterType::PropertyFilter(
                    proto::PropertyFilter {
                        property: Some(proto::PropertyReference {
                            name: "__key__".to_string(),
                        }),
                        op: proto::property_filter::Operator::HasAncestor as i32,
                        value: Some(proto::Value {
                            meaning: 0,
                            exclude_from_indexes: false,
                            value_type: Some(proto::value::ValueType::KeyValue(
                                convert::key_to_proto(ancestor),
                            )),
                        }),
                    },
                )),
            },
        }
    }

    /// All of the given filters must hold.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self {
            inner: compose(filters.into_iter().map(|f| f.inner).collect()),
        }
    }

    pub(crate) fn into_proto(self) -> proto::Filter {
        self.inner
    }
}

/// AND-compose filters; a single filter stays a bare property filter.
fn compose(mut filters: Vec<proto::Filter>) -> proto::Filter {
    if filters.len() == 1 {
        return filters.remove(0);
    }
    proto::Filter {
        filter_type: Some(proto::filter::FilterType::CompositeFilter(
            proto::CompositeFilter {
                op: proto::composite_filter::Operator::And as i32,
                filters,
            },
        )),
    }
}

/// A sort order on a single property.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    inner: proto::PropertyOrder,
}

impl Order {
    /// Ascending order on `name`.
    pub fn asc(name: impl Into<String>) -> Self {
        Self::direction(name, proto::property_order::Direction::Ascending)
    }

    /// Descending order on `name`.
    pub fn desc(name: impl Into<String>) -> Self {
        Self::direction(name, proto::property_order::Direction::Descending)
    }

    fn direction(name: impl Into<String>, direction: proto::property_order::Direction) -> Self {
        Self {
            inner: proto::PropertyOrder {
                property: Some(proto::PropertyReference { name: name.into() }),
                direction: direction as i32,
            },
        }
    }

    pub(crate) fn into_proto(self) -> proto::PropertyOrder {
        self.inner
    }
}

/// Entity query builder.
///
/// Aggregates filters, orders, projections, cursors and limits into one
/// `RunQuery` request message.
#[derive(Debug, Clone, Default)]
pub struct Query {
    kind: Option<String>,
    namespace: Option<String>,
    filters: Vec<proto::Filter>,
    orders: Vec<proto::PropertyOrder>,
    projections: Vec<String>,
    distinct_on: Vec<String>,
    start_cursor: Option<Bytes>,
    end_cursor: Option<Bytes>,
    offset: i32,
    limit: Option<i32>,
}

impl Query {
    /// Create a new query over a single kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: Some(kind.into()),
            ..Self::default()
        }
    }

    /// Create a kindless query, matching entities of every kind.
    pub fn kindless() -> Self {
        Self::default()
    }

    /// Scope the query to a namespace, overriding the client default.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Add a filter. Repeated filters are AND-composed.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter.into_proto());
        self
    }

    /// Restrict results to descendants of `ancestor`.
    pub fn ancestor(self, ancestor: &Key) -> Self {
        self.filter(Filter::has_ancestor(ancestor))
    }

    /// Add a sort order. Repeated orders apply in sequence.
    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order.into_proto());
        self
    }

    /// Project a single property instead of returning full entities.
    pub fn project(mut self, property: impl Into<String>) -> Self {
        self.projections.push(property.into());
        self
    }

    /// Return only the first result for each distinct value of `property`.
    pub fn distinct_on(mut self, property: impl Into<String>) -> Self {
        self.distinct_on.push(property.into());
        self
    }

    /// Resume after the position marked by an opaque cursor.
    pub fn start_cursor(mut self, cursor: impl Into<Bytes>) -> Self {
        self.start_cursor = Some(cursor.into());
        self
    }

    /// Stop at the position marked by an opaque cursor.
    pub fn end_cursor(mut self, cursor: impl Into<Bytes>) -> Self {
        self.end_cursor = Some(cursor.into());
        self
    }

    /// Skip the first `offset` results.
    pub fn offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }

    /// Return at most `limit` results.
    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn namespace_override(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub(crate) fn into_proto(self) -> proto::Query {
        proto::Query {
            projection: self
                .projections
                .into_iter()
                .map(|name| proto::Projection {
                    property: Some(proto::PropertyReference { name }),
                })
                .collect(),
            kind: self
                .kind
                .into_iter()
                .map(|name| proto::KindExpression { name })
                .collect(),
            filter: match self.filters.len() {
                0 => None,
                _ => Some(compose(self.filters)),
            },
            order: self.orders,
            distinct_on: self
                .distinct_on
                .into_iter()
                .map(|name| proto::PropertyReference { name })
                .collect(),
            start_cursor: self.start_cursor.map(|c| c.to_vec()).unwrap_or_default(),
            end_cursor: self.end_cursor.map(|c| c.to_vec()).unwrap_or_default(),
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// Keys-only query builder.
///
/// Forces the reserved `__key__` projection; results decode to [`Key`]s
/// without fetching entity properties.
#[derive(Debug, Clone, Default)]
pub struct KeyQuery {
    inner: Query,
}

impl KeyQuery {
    /// Create a new keys-only query over a single kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            inner: Query::new(kind),
        }
    }

    /// Create a kindless keys-only query.
    pub fn kindless() -> Self {
        Self {
            inner: Query::kindless(),
        }
    }

    /// Scope the query to a namespace, overriding the client default.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.inner = self.inner.namespace(namespace);
        self
    }

    /// Add a filter. Repeated filters are AND-composed.
    pub fn filter(mut self, filter: Filter) -> Self {
        self.inner = self.inner.filter(filter);
        self
    }

    /// Restrict results to descendants of `ancestor`.
    pub fn ancestor(mut self, ancestor: &Key) -> Self {
        self.inner = self.inner.ancestor(ancestor);
        self
    }

    /// Add a sort order.
    pub fn order(mut self, order: Order) -> Self {
        self.inner = self.inner.order(order);
        self
    }

    /// Resume after the position marked by an opaque cursor.
    pub fn start_cursor(mut self, cursor: impl Into<Bytes>) -> Self {
        self.inner = self.inner.start_cursor(cursor);
        self
    }

    /// Stop at the position marked by an opaque cursor.
    pub fn end_cursor(mut self, cursor: impl Into<Bytes>) -> Self {
        self.inner = self.inner.end_cursor(cursor);
        self
    }

    /// Skip the first `offset` results.
    pub fn offset(mut self, offset: i32) -> Self {
        self.inner = self.inner.offset(offset);
        self
    }

    /// Return at most `limit` results.
    pub fn limit(mut self, limit: i32) -> Self {
        self.inner = self.inner.limit(limit);
        self
    }

    pub(crate) fn namespace_override(&self) -> Option<&str> {
        self.inner.namespace_override()
    }

    pub(crate) fn into_proto(self) -> proto::Query {
        let mut query = self.inner.into_proto();
        query.projection = vec![proto::Projection {
            property: Some(proto::PropertyReference {
                name: "__key__".to_string(),
            }),
        }];
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_filter_stays_bare() {
        let query = Query::new("Task").filter(Filter::eq("done", false));
        let pq = query.into_proto();

        let filter = pq.filter.unwrap();
        assert!(matches!(
            filter.filter_type,
            Some(proto::filter::FilterType::PropertyFilter(_))
        ));
    }

    #[test]
    fn test_multiple_filters_compose_with_and() {
        let query = Query::new("Task")
            .filter(Filter::eq("done", false))
            .filter(Filter::ge("priority", 4i64));
        let pq = query.into_proto();

        let Some(proto::filter::FilterType::CompositeFilter(cf)) =
            pq.filter.unwrap().filter_type
        else {
            panic!("expected composite filter");
        };
        assert_eq!(cf.op, proto::composite_filter::Operator::And as i32);
        assert_eq!(cf.filters.len(), 2);
    }

    #[test]
    fn test_query_fields_map_onto_wire_message() {
        let query = Query::new("Task")
            .order(Order::desc("priority"))
            .project("priority")
            .distinct_on("category")
            .start_cursor(Bytes::from_static(b"abc"))
            .offset(5)
            .limit(10);
        let pq = query.into_proto();

        assert_eq!(pq.kind[0].name, "Task");
        assert_eq!(
            pq.order[0].direction,
            proto::property_order::Direction::Descending as i32
        );
        assert_eq!(pq.projection[0].property.as_ref().unwrap().name, "priority");
        assert_eq!(pq.distinct_on[0].name, "category");
        assert_eq!(pq.start_cursor, b"abc".to_vec());
        assert!(pq.end_cursor.is_empty());
        assert_eq!(pq.offset, 5);
        assert_eq!(pq.limit, Some(10));
    }

    #[test]
    fn test_kindless_query_has_no_kind_and_no_filter() {
        let pq = Query::kindless().into_proto();
        assert!(pq.kind.is_empty());
        assert!(pq.filter.is_none());
        assert!(pq.limit.is_none());
    }

    #[test]
    fn test_ancestor_filter_targets_reserved_key_property() {
        let ancestor = dstore_core::Key::with_name("Org", "acme");
        let pq = Query::new("User").ancestor(&ancestor).into_proto();

        let Some(proto::filter::FilterType::PropertyFilter(pf)) =
            pq.filter.unwrap().filter_type
        else {
            panic!("expected property filter");
        };
        assert_eq!(pf.property.unwrap().name, "__key__");
        assert_eq!(pf.op, proto::property_filter::Operator::HasAncestor as i32);
    }

    #[test]
    fn test_key_query_forces_key_projection() {
        let pq = KeyQuery::new("Task")
            .filter(Filter::eq("done", true))
            .limit(3)
            .into_proto();

        assert_eq!(pq.projection.len(), 1);
        assert_eq!(pq.projection[0].property.as_ref().unwrap().name, "__key__");
        assert_eq!(pq.limit, Some(3));
    }

    #[test]
    fn test_in_filter_wraps_values_in_array() {
        let pq = Query::new("Task")
            .filter(Filter::in_list(
                "category",
                vec![Value::from("a"), Value::from("b")],
            ))
            .into_proto();

        let Some(proto::filter::FilterType::PropertyFilter(pf)) =
            pq.filter.unwrap().filter_type
        else {
            panic!("expected property filter");
        };
        assert_eq!(pf.op, proto::property_filter::Operator::In as i32);
        assert!(matches!(
            pf.value.unwrap().value_type,
            Some(proto::value::ValueType::ArrayValue(_))
        ));
    }
}
