use std::{collections::VecDeque, fmt};

use crate::arena::{Color, Link};
use crate::{KeyOf, RbTree};

impl<T: fmt::Debug, X, C> fmt::Debug for RbTree<T, X, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T, X, C> RbTree<T, X, C>
where
    X: KeyOf<T>,
    X::Key: fmt::Display,
{
    /// Writes the shape of the tree as a Graphviz digraph named `name`.
    ///
    /// Nodes are labeled with their key and filled with their color. `Nil` links are drawn as
    /// points, the two `End` links as squares.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item {
            Node(usize),
            Missing(u32, Link),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut edges = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _rank_node in 0..queue.len() {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let node = match item {
                    Item::Node(node) => node,
                    Item::Missing(id, link) => {
                        let shape = match link {
                            Link::End => "square",
                            _ => "point",
                        };
                        write!(w, "\"graph{name}-missing{id}\" [shape={shape}]; ")?;
                        continue;
                    }
                };

                let key = self.extract.key_of(self.nodes.value(node));
                let (fill, font) = match self.nodes.links(node).color() {
                    Color::Red => ("red", "black"),
                    Color::Black => ("black", "white"),
                };
                write!(
                    w,
                    "\"graph{name}-{node}\" [label=\"{key}\", style=filled, fillcolor={fill}, fontcolor={font}]; "
                )?;

                for child in [self.nodes.links(node).left(), self.nodes.links(node).right()] {
                    match child {
                        Link::Node(child) => {
                            queue.push_back(Item::Node(child));
                            writeln!(edges, "\"graph{name}-{node}\" -> \"graph{name}-{child}\";")?;
                        }
                        absent => {
                            queue.push_back(Item::Missing(missing, absent));
                            writeln!(
                                edges,
                                "\"graph{name}-{node}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }
}
