// Subway
// Copyright 2026 The Subway Authors
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! In-memory view of a line's station chain and the splice logic that mutates it.

use crate::driver::{DriverError, DriverResult};
use crate::model::LineStation;
use std::collections::HashMap;

/// A pointer rewrite that must be persisted to keep the chain connected after a mutation.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Relink {
    /// The link whose predecessor pointer must be rewritten.
    pub(crate) station_id: i64,

    /// The new predecessor of that link.
    pub(crate) previous_station_id: Option<i64>,
}

/// The set of chain links of one line, loaded from the database in no particular order.
///
/// Links point backwards: the unique link without a predecessor is the head.  Mutations do not
/// modify the chain in place; they validate against the current state and report the minimal
/// set of writes (the new or removed link plus at most one `Relink`) for the caller to persist.
pub(crate) struct Chain {
    /// The links of the chain, in storage order.
    links: Vec<LineStation>,
}

impl Chain {
    /// Creates a chain view from the `links` of one line.
    pub(crate) fn new(links: Vec<LineStation>) -> Self {
        Self { links }
    }

    /// Validates the insertion of `link` into the chain.
    ///
    /// On success, returns the pointer rewrite that must be applied to the link currently
    /// occupying the insertion point, if any.  Inserting at the tail of the chain (or into an
    /// empty chain) requires no rewrite.
    pub(crate) fn insert(&self, link: &LineStation) -> DriverResult<Option<Relink>> {
        if self.links.iter().any(|l| l.station_id() == link.station_id()) {
            return Err(DriverError::AlreadyExists(format!(
                "Station {} is already registered in the line",
                link.station_id()
            )));
        }

        if let Some(previous) = link.previous_station_id() {
            if !self.links.iter().any(|l| l.station_id() == previous) {
                return Err(DriverError::InvalidInput(format!(
                    "Previous station {} is not registered in the line",
                    previous
                )));
            }
        }

        // The link that currently hangs off the insertion point, if any, must be respliced to
        // hang off the new station instead.
        let displaced = self
            .links
            .iter()
            .find(|l| l.previous_station_id() == link.previous_station_id());
        Ok(displaced.map(|l| Relink {
            station_id: *l.station_id(),
            previous_station_id: Some(*link.station_id()),
        }))
    }

    /// Validates the removal of `station_id` from the chain.
    ///
    /// On success, returns the removed link and the pointer rewrite that must be applied to its
    /// successor, if it has one.
    pub(crate) fn remove(&self, station_id: i64) -> DriverResult<(LineStation, Option<Relink>)> {
        let removed = match self.links.iter().find(|l| *l.station_id() == station_id) {
            Some(link) => link.clone(),
            None => {
                return Err(DriverError::InvalidInput(format!(
                    "Station {} is not registered in the line",
                    station_id
                )))
            }
        };

        let successor = self
            .links
            .iter()
            .find(|l| *l.previous_station_id() == Some(station_id));
        let relink = successor.map(|l| Relink {
            station_id: *l.station_id(),
            previous_station_id: *removed.previous_station_id(),
        });
        Ok((removed, relink))
    }

    /// Consumes the chain and returns its links in traversal order, head first.
    ///
    /// Fails if the persisted links do not form a single connected chain, which can only happen
    /// if the database was tampered with.
    pub(crate) fn ordered(self) -> DriverResult<Vec<LineStation>> {
        let corrupt = || DriverError::BackendError("Line chain is corrupt".to_owned());

        if self.links.is_empty() {
            return Ok(vec![]);
        }

        let total = self.links.len();
        let mut by_previous = HashMap::with_capacity(total);
        for link in self.links {
            if by_previous.insert(*link.previous_station_id(), link).is_some() {
                // Two links claim the same predecessor.
                return Err(corrupt());
            }
        }

        let mut ordered = Vec::with_capacity(total);
        let mut cursor = None;
        while let Some(link) = by_previous.remove(&cursor) {
            cursor = Some(*link.station_id());
            ordered.push(link);
        }
        if ordered.len() != total {
            // No head, or a cycle disconnected from the head.
            return Err(corrupt());
        }
        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Syntactic sugar to build a link without caring about distances.
    fn link(station_id: i64, previous_station_id: Option<i64>) -> LineStation {
        LineStation::new(station_id, previous_station_id, 10, 5)
    }

    #[test]
    fn test_insert_into_empty() {
        let chain = Chain::new(vec![]);
        assert_eq!(None, chain.insert(&link(1, None)).unwrap());
    }

    #[test]
    fn test_insert_at_head_resplices_old_head() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(1))]);
        assert_eq!(
            Some(Relink { station_id: 1, previous_station_id: Some(3) }),
            chain.insert(&link(3, None)).unwrap()
        );
    }

    #[test]
    fn test_insert_in_middle_resplices_successor() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(1))]);
        assert_eq!(
            Some(Relink { station_id: 2, previous_station_id: Some(3) }),
            chain.insert(&link(3, Some(1))).unwrap()
        );
    }

    #[test]
    fn test_insert_at_tail_needs_no_resplice() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(1))]);
        assert_eq!(None, chain.insert(&link(3, Some(2))).unwrap());
    }

    #[test]
    fn test_insert_duplicate_station() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(1))]);
        assert_eq!(
            DriverError::AlreadyExists(
                "Station 2 is already registered in the line".to_owned()
            ),
            chain.insert(&link(2, Some(1))).unwrap_err()
        );
    }

    #[test]
    fn test_insert_after_unknown_station() {
        let chain = Chain::new(vec![link(1, None)]);
        assert_eq!(
            DriverError::InvalidInput(
                "Previous station 5 is not registered in the line".to_owned()
            ),
            chain.insert(&link(2, Some(5))).unwrap_err()
        );

        let chain = Chain::new(vec![]);
        assert_eq!(
            DriverError::InvalidInput(
                "Previous station 1 is not registered in the line".to_owned()
            ),
            chain.insert(&link(2, Some(1))).unwrap_err()
        );
    }

    #[test]
    fn test_remove_head_promotes_successor() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(1)), link(3, Some(2))]);
        let (removed, relink) = chain.remove(1).unwrap();
        assert_eq!(link(1, None), removed);
        assert_eq!(Some(Relink { station_id: 2, previous_station_id: None }), relink);
    }

    #[test]
    fn test_remove_middle_bridges_neighbors() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(1)), link(3, Some(2))]);
        let (removed, relink) = chain.remove(2).unwrap();
        assert_eq!(link(2, Some(1)), removed);
        assert_eq!(Some(Relink { station_id: 3, previous_station_id: Some(1) }), relink);
    }

    #[test]
    fn test_remove_tail_needs_no_resplice() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(1)), link(3, Some(2))]);
        let (removed, relink) = chain.remove(3).unwrap();
        assert_eq!(link(3, Some(2)), removed);
        assert_eq!(None, relink);
    }

    #[test]
    fn test_remove_only_station() {
        let chain = Chain::new(vec![link(1, None)]);
        let (removed, relink) = chain.remove(1).unwrap();
        assert_eq!(link(1, None), removed);
        assert_eq!(None, relink);
    }

    #[test]
    fn test_remove_unregistered_station() {
        let chain = Chain::new(vec![link(1, None)]);
        assert_eq!(
            DriverError::InvalidInput("Station 7 is not registered in the line".to_owned()),
            chain.remove(7).unwrap_err()
        );
    }

    #[test]
    fn test_ordered_empty() {
        assert_eq!(Vec::<LineStation>::new(), Chain::new(vec![]).ordered().unwrap());
    }

    #[test]
    fn test_ordered_ignores_storage_order() {
        let chain = Chain::new(vec![link(3, Some(2)), link(1, None), link(2, Some(1))]);
        assert_eq!(
            vec![link(1, None), link(2, Some(1)), link(3, Some(2))],
            chain.ordered().unwrap()
        );
    }

    #[test]
    fn test_ordered_detects_missing_head() {
        let chain = Chain::new(vec![link(1, Some(2)), link(2, Some(1))]);
        assert_eq!(
            DriverError::BackendError("Line chain is corrupt".to_owned()),
            chain.ordered().unwrap_err()
        );
    }

    #[test]
    fn test_ordered_detects_forked_chain() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(1)), link(3, Some(1))]);
        assert_eq!(
            DriverError::BackendError("Line chain is corrupt".to_owned()),
            chain.ordered().unwrap_err()
        );
    }

    #[test]
    fn test_ordered_detects_disconnected_cycle() {
        let chain = Chain::new(vec![link(1, None), link(2, Some(3)), link(3, Some(2))]);
        assert_eq!(
            DriverError::BackendError("Line chain is corrupt".to_owned()),
            chain.ordered().unwrap_err()
        );
    }
}
