//! The route table.
//!
//! Built once at startup, read-only afterwards. Routes are indexed by method,
//! then by segment count, then by their first literal segment; candidates
//! that survive the pruning are tried in precedence order:
//!
//! 1. Most specific first: at the first segment where two patterns differ,
//!    a literal beats a variable. `/items/active` wins over `/items/{id}`.
//! 2. Registration order breaks remaining ties: the route registered first
//!    wins. This is stable across builds.
//!
//! Content negotiation runs across every route whose pattern captures the
//! path. The client's most preferred producible type is chosen first, then
//! the highest-ranked route producing it answers. A JSON-only
//! `/items/active` therefore does not hide an XML `/items/{id}` from a client
//! asking for XML.
//!
//! Routes with the same shape (same literals and variables in the same
//! positions) can only be told apart by content negotiation, so their
//! produced types must not overlap. [`RouteTable::build`] rejects any
//! overlap.

use std::collections::HashMap;

use tracing::info;

use crate::error::RegistrationError;
use crate::media::{Accept, MediaType};
use crate::method::Method;
use crate::pattern::split_path;
use crate::route::RouteDescriptor;

/// Outcome of [`RouteTable::match_route`].
#[derive(Debug)]
pub enum Lookup<'a> {
    Found(Match<'a>),
    NotFound,
    /// A path matched but none of its routes produce an acceptable type.
    NotAcceptable(&'a RouteDescriptor),
    /// More than one route can answer. Unreachable for a table that passed
    /// [`RouteTable::build`].
    Ambiguous,
}

/// A resolved route with its captured variables and negotiated media type.
#[derive(Debug)]
pub struct Match<'a> {
    pub route: &'a RouteDescriptor,
    pub params: HashMap<String, String>,
    pub media: MediaType,
}

/// Candidates for one (method, segment count) pair.
#[derive(Debug, Default)]
struct Bucket {
    /// Route indices in precedence order.
    ranked: Vec<usize>,
    /// Positions in `ranked` whose pattern starts with the keyed literal.
    by_literal: HashMap<String, Vec<usize>>,
    /// Positions in `ranked` whose pattern starts with a variable (or is `/`).
    other: Vec<usize>,
}

impl Bucket {
    /// Positions to try for a path starting with `first`, in rank order.
    fn candidates(&self, first: Option<&str>) -> Vec<usize> {
        let literal = first
            .and_then(|f| self.by_literal.get(f))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let mut merged = Vec::with_capacity(literal.len() + self.other.len());
        let (mut i, mut j) = (0, 0);
        while i < literal.len() && j < self.other.len() {
            if literal[i] < self.other[j] {
                merged.push(literal[i]);
                i += 1;
            } else {
                merged.push(self.other[j]);
                j += 1;
            }
        }
        merged.extend_from_slice(&literal[i..]);
        merged.extend_from_slice(&self.other[j..]);
        merged
    }
}

/// Every registered route, indexed for lookup.
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
    index: HashMap<Method, HashMap<usize, Bucket>>,
}

impl RouteTable {
    /// Indexes `routes`, which must be in registration order.
    ///
    /// Fails when two routes on the same method have the same shape and
    /// overlapping produced types.
    pub fn build(routes: Vec<RouteDescriptor>) -> Result<Self, RegistrationError> {
        for (i, a) in routes.iter().enumerate() {
            for b in &routes[i + 1..] {
                if a.method() != b.method() || !a.pattern().same_shape(b.pattern()) {
                    continue;
                }
                if let Some(media) = a.produces().iter().find(|m| b.produces().contains(m)) {
                    return Err(RegistrationError::Ambiguous {
                        method: a.method(),
                        first: a.pattern().to_string(),
                        second: b.pattern().to_string(),
                        media: media.as_str(),
                    });
                }
            }
        }

        let mut grouped: HashMap<Method, HashMap<usize, Vec<usize>>> = HashMap::new();
        for (i, route) in routes.iter().enumerate() {
            grouped
                .entry(route.method())
                .or_default()
                .entry(route.pattern().len())
                .or_default()
                .push(i);
        }

        let mut index: HashMap<Method, HashMap<usize, Bucket>> = HashMap::new();
        for (method, by_len) in grouped {
            for (len, mut ids) in by_len {
                // Index order is registration order: it breaks specificity ties.
                ids.sort_by_cached_key(|&i| (routes[i].pattern().specificity_key(), i));
                let mut bucket = Bucket::default();
                for (pos, &i) in ids.iter().enumerate() {
                    match routes[i].pattern().first_literal() {
                        Some(lit) => bucket.by_literal.entry(lit.to_owned()).or_default().push(pos),
                        None => bucket.other.push(pos),
                    }
                }
                bucket.ranked = ids;
                index.entry(method).or_default().insert(len, bucket);
            }
        }

        for route in &routes {
            info!(
                method = %route.method(),
                pattern = %route.pattern(),
                produces = ?route.produces(),
                "route registered"
            );
        }

        Ok(Self { routes, index })
    }

    /// All routes in registration order.
    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolves a request to a single route.
    ///
    /// `accept` is the raw `Accept` header; absent means anything goes.
    /// Deterministic: the same arguments always produce the same outcome.
    pub fn match_route(&self, method: Method, path: &str, accept: Option<&str>) -> Lookup<'_> {
        let parts = split_path(path);
        let Some(bucket) = self.index.get(&method).and_then(|b| b.get(&parts.len())) else {
            return Lookup::NotFound;
        };

        // Every route whose pattern captures the path competes, in
        // precedence order.
        let candidates: Vec<(&RouteDescriptor, HashMap<String, String>)> = bucket
            .candidates(parts.first().copied())
            .into_iter()
            .map(|pos| &self.routes[bucket.ranked[pos]])
            .filter_map(|route| route.pattern().capture(&parts).map(|params| (route, params)))
            .collect();
        let Some(&(most_specific, _)) = candidates.first() else {
            return Lookup::NotFound;
        };

        // The client's preference picks the type; ties go to the more
        // specific route's declaration order.
        let offered: Vec<MediaType> = candidates
            .iter()
            .flat_map(|(route, _)| route.produces().iter().copied())
            .collect();
        let Some(media) = Accept::parse(accept).negotiate(&offered) else {
            return Lookup::NotAcceptable(most_specific);
        };

        let mut owners = candidates.into_iter().filter(|(route, _)| route.produces().contains(&media));
        match (owners.next(), owners.next()) {
            (Some((first, _)), Some((second, _))) if first.pattern().same_shape(second.pattern()) => {
                Lookup::Ambiguous
            }
            (Some((route, params)), _) => Lookup::Found(Match { route, params, media }),
            (None, _) => Lookup::NotAcceptable(most_specific),
        }
    }
}
