//! Disjoint-set forest over provisional labels.

/// Union-find over labels `0..len`, where the smaller label of two merged
/// sets always becomes the root. Label 0 is reserved for background and is
/// never merged.
#[derive(Debug, Clone)]
pub(crate) struct DisjointSet {
    parent: Vec<u32>,
}

impl DisjointSet {
    /// A forest holding only the background label.
    pub fn new() -> Self {
        Self { parent: vec![0] }
    }

    /// A forest of `count` singleton labels plus background.
    pub fn with_labels(count: u32) -> Self {
        Self {
            parent: (0..=count).collect(),
        }
    }

    /// Allocate the next label as its own root.
    pub fn make_set(&mut self) -> u32 {
        let label = self.parent.len() as u32;
        self.parent.push(label);
        label
    }

    /// Number of labels excluding background.
    pub fn len(&self) -> u32 {
        (self.parent.len() - 1) as u32
    }

    /// Root of `label`, halving the path on the way up.
    pub fn find(&mut self, label: u32) -> u32 {
        let mut current = label as usize;
        while self.parent[current] as usize != current {
            let grandparent = self.parent[self.parent[current] as usize];
            self.parent[current] = grandparent;
            current = grandparent as usize;
        }
        current as u32
    }

    /// Merge the sets containing `a` and `b`; returns the surviving root.
    pub fn union(&mut self, a: u32, b: u32) -> u32 {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return root_a;
        }
        let (low, high) = if root_a < root_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent[high as usize] = low;
        low
    }

    /// Map every label to a dense final id, numbered from 1 in ascending order
    /// of each set's root. Index 0 maps to 0.
    pub fn dense_relabel(&mut self) -> (Vec<u32>, u32) {
        let mut mapping = vec![0u32; self.parent.len()];
        let mut next = 0u32;
        for label in 1..self.parent.len() as u32 {
            let root = self.find(label);
            if root == label {
                next += 1;
                mapping[label as usize] = next;
            } else {
                // Roots are the smallest label of their set, so already assigned.
                mapping[label as usize] = mapping[root as usize];
            }
        }
        (mapping, next)
    }
}
