// src/dag/graph.rs

use std::collections::{HashMap, VecDeque};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::dag::job::{JobId, JobSpec};
use crate::errors::{JobdagError, Result};

/// Validated job dependency graph.
///
/// Jobs are addressed by their position in the input (`usize`), which is also
/// their petgraph node index. Edges point from a dependency to its dependent.
#[derive(Debug, Clone)]
pub struct JobGraph {
    graph: DiGraph<JobId, ()>,
    index: HashMap<JobId, usize>,
    /// Direct dependents, in input order.
    children: Vec<Vec<usize>>,
    /// Number of dependency edges pointing at each job.
    indegree: Vec<usize>,
}

impl JobGraph {
    /// Build and validate the graph.
    ///
    /// Fails with:
    /// - `DuplicateId` if two jobs share an id,
    /// - `UnknownDependency` if a dependency names no job,
    /// - `CycleDetected` if Kahn's algorithm cannot order every job.
    pub fn build(jobs: &[JobSpec]) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(jobs.len(), jobs.len());
        let mut index = HashMap::with_capacity(jobs.len());

        for (i, job) in jobs.iter().enumerate() {
            if index.insert(job.id.clone(), i).is_some() {
                return Err(JobdagError::DuplicateId(job.id.clone()));
            }
            graph.add_node(job.id.clone());
        }

        let mut children = vec![Vec::new(); jobs.len()];
        let mut indegree = vec![0usize; jobs.len()];

        for (i, job) in jobs.iter().enumerate() {
            for dep in &job.deps {
                let Some(&d) = index.get(dep) else {
                    return Err(JobdagError::UnknownDependency {
                        job: job.id.clone(),
                        dependency: dep.clone(),
                    });
                };
                graph.add_edge(NodeIndex::new(d), NodeIndex::new(i), ());
                children[d].push(i);
                indegree[i] += 1;
            }
        }

        let dag = Self {
            graph,
            index,
            children,
            indegree,
        };
        dag.ensure_acyclic()?;
        Ok(dag)
    }

    /// Kahn's algorithm: repeatedly remove indegree-0 nodes. If fewer nodes
    /// are removed than exist, the remainder contains a cycle.
    fn ensure_acyclic(&self) -> Result<()> {
        let order = self.topological_order();
        if order.len() == self.len() {
            return Ok(());
        }
        Err(JobdagError::CycleDetected(self.describe_cycle()))
    }

    /// Topological order of all jobs reachable by Kahn's algorithm.
    ///
    /// On an acyclic graph this contains every job.
    pub fn topological_order(&self) -> Vec<usize> {
        let mut indeg = self.indegree.clone();
        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&i| indeg[i] == 0).collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(n) = queue.pop_front() {
            order.push(n);
            for &c in &self.children[n] {
                indeg[c] -= 1;
                if indeg[c] == 0 {
                    queue.push_back(c);
                }
            }
        }
        order
    }

    /// Name the jobs of one cycle, for the error message.
    fn describe_cycle(&self) -> String {
        let cyclic = tarjan_scc(&self.graph).into_iter().find(|scc| {
            scc.len() > 1 || scc.iter().any(|&n| self.graph.contains_edge(n, n))
        });

        match cyclic {
            Some(mut scc) => {
                scc.sort();
                let names: Vec<&str> = scc.iter().map(|&n| self.graph[n].as_str()).collect();
                format!("cycle involving jobs [{}]", names.join(", "))
            }
            None => "cycle detected".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn id_of(&self, pos: usize) -> &str {
        self.graph[NodeIndex::new(pos)].as_str()
    }

    /// Direct dependents of the job at `pos`.
    pub fn children_of(&self, pos: usize) -> &[usize] {
        self.children.get(pos).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn indegree_of(&self, pos: usize) -> usize {
        self.indegree.get(pos).copied().unwrap_or(0)
    }

    /// Jobs without dependencies, in input order.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len()).filter(|&i| self.indegree[i] == 0)
    }
}
