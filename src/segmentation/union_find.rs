/// Disjoint-set over positive labels.
///
/// Labels are registered lazily: the first time a label is seen it becomes
/// its own root. `union` always hangs the larger root under the smaller one,
/// so the canonical label of a set is the smallest label ever placed in it.
#[derive(Debug, Default, Clone)]
pub struct UnionFind {
    // parent[label]; slot 0 is unused (background).
    parent: Vec<u32>,
}

impl UnionFind {
    pub fn new() -> Self {
        Self { parent: vec![0] }
    }

    fn register(&mut self, label: u32) {
        let idx = label as usize;
        if self.parent.len() <= idx {
            let start = self.parent.len() as u32;
            self.parent.extend(start..=label);
        }
    }

    /// Registers and returns the next unused label.
    pub fn make_set(&mut self) -> u32 {
        let label = self.parent.len().max(1) as u32;
        self.register(label);
        label
    }

    /// Root of `label`, compressing the path behind it.
    pub fn find(&mut self, label: u32) -> u32 {
        debug_assert!(label > 0, "label 0 is background");
        self.register(label);

        let mut root = label;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }

        let mut current = label;
        while current != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        root
    }

    pub fn union(&mut self, a: u32, b: u32) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[larger as usize] = smaller;
        }
    }

    /// Number of labels registered so far.
    pub fn len(&self) -> usize {
        self.parent.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
