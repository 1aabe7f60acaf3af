//! Concrete parse tree.

/// A node of the concrete parse tree built by the driver.
///
/// Leaves wrap the shifted tokens; branches carry the left-hand side of the
/// reduced production and its right-hand side in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseNode<TTok, TSym> {
    Leaf(TTok),
    Branch {
        symbol: TSym,
        children: Vec<ParseNode<TTok, TSym>>,
    },
}

impl<TTok, TSym> ParseNode<TTok, TSym> {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(..))
    }

    pub fn token(&self) -> Option<&TTok> {
        match self {
            Self::Leaf(token) => Some(token),
            Self::Branch { .. } => None,
        }
    }

    pub fn symbol(&self) -> Option<&TSym> {
        match self {
            Self::Leaf(..) => None,
            Self::Branch { symbol, .. } => Some(symbol),
        }
    }

    pub fn children(&self) -> &[ParseNode<TTok, TSym>] {
        match self {
            Self::Leaf(..) => &[],
            Self::Branch { children, .. } => &children[..],
        }
    }

    /// Iterate over the leaf tokens from left to right.
    pub fn leaves(&self) -> Leaves<'_, TTok, TSym> {
        Leaves { stack: vec![self] }
    }

    /// Visit every node in pre-order together with its depth.
    pub fn walk<F>(&self, mut f: F)
    where
        F: FnMut(usize, &ParseNode<TTok, TSym>),
    {
        let mut stack = vec![(0, self)];
        while let Some((depth, node)) = stack.pop() {
            f(depth, node);
            for child in node.children().iter().rev() {
                stack.push((depth + 1, child));
            }
        }
    }
}

#[derive(Debug)]
pub struct Leaves<'t, TTok, TSym> {
    stack: Vec<&'t ParseNode<TTok, TSym>>,
}

impl<'t, TTok, TSym> Iterator for Leaves<'t, TTok, TSym> {
    type Item = &'t TTok;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            match node {
                ParseNode::Leaf(token) => return Some(token),
                ParseNode::Branch { children, .. } => self.stack.extend(children.iter().rev()),
            }
        }
        None
    }
}
