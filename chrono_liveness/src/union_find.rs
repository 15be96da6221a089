//! Union-find over temporaries, used by phi-aware coalescing (§4.2) to
//! merge interference nodes.

use hashbrown::HashMap;

use chrono_ir::TempId;

#[derive(Debug, Default)]
pub struct UnionFind {
    parent: HashMap<TempId, TempId>,
    rank: HashMap<TempId, u32>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure(&mut self, t: TempId) {
        self.parent.entry(t).or_insert(t);
        self.rank.entry(t).or_insert(0);
    }

    /// Finds `t`'s representative, path-compressing along the way.
    pub fn find(&mut self, t: TempId) -> TempId {
        self.ensure(t);
        let p = self.parent[&t];
        if p == t {
            return t;
        }
        let root = self.find(p);
        self.parent.insert(t, root);
        root
    }

    /// Unions the sets containing `a` and `b` (union by rank), returning
    /// the new root.
    pub fn union(&mut self, a: TempId, b: TempId) -> TempId {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return ra;
        }
        let (rank_a, rank_b) = (self.rank[&ra], self.rank[&rb]);
        match rank_a.cmp(&rank_b) {
            std::cmp::Ordering::Less => {
                self.parent.insert(ra, rb);
                rb
            }
            std::cmp::Ordering::Greater => {
                self.parent.insert(rb, ra);
                ra
            }
            std::cmp::Ordering::Equal => {
                self.parent.insert(rb, ra);
                self.rank.insert(ra, rank_a + 1);
                ra
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use super::*;

    #[test_case(3; "three singleton chains merge pairwise")]
    #[test_case(8; "a larger run of temporaries merges pairwise")]
    fn union_merges_find_results(n: u32) {
        let mut uf = UnionFind::new();
        let temps: Vec<TempId> = (0..n).map(TempId).collect();
        for t in &temps {
            for other in &temps {
                if t != other {
                    assert_ne!(uf.find(*t), uf.find(*other));
                }
            }
        }
        for pair in temps.windows(2) {
            uf.union(pair[0], pair[1]);
        }
        let root = uf.find(temps[0]);
        for t in &temps {
            assert_eq!(uf.find(*t), root);
        }
    }
}
