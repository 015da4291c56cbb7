//! A small LIFO used for both the control stack and the stash.

use std::fmt;

#[derive(Clone)]
pub struct Stack<T> {
    items: Vec<T>,
}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Stack { items: vec![] }
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Pushes in the given order, so the last item ends up on top.
    pub fn push_all<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.items.extend(items);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.last()
    }

    /// Looks `depth` items below the top without removing anything. `peek_n(0)`
    /// is the top.
    pub fn peek_n(&self, depth: usize) -> Option<&T> {
        let len = self.items.len();
        if depth < len {
            self.items.get(len - 1 - depth)
        } else {
            None
        }
    }

    pub fn peek_n_mut(&mut self, depth: usize) -> Option<&mut T> {
        let len = self.items.len();
        if depth < len {
            self.items.get_mut(len - 1 - depth)
        } else {
            None
        }
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bottom to top.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Display> fmt::Display for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, item) in self.items.iter().rev().enumerate() {
            writeln!(f, "{:>4}: {}", idx, item)?;
        }
        Ok(())
    }
}

impl<T: fmt::Debug> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Stack;

    #[test]
    fn test_push_all_keeps_last_on_top() {
        let mut stack = Stack::new();
        stack.push_all(vec![1, 2, 3]);
        assert_eq!(stack.peek(), Some(&3));
        assert_eq!(stack.pop(), Some(3));
        assert_eq!(stack.pop(), Some(2));
        assert_eq!(stack.size(), 1);
    }

    #[test]
    fn test_peek_n() {
        let mut stack = Stack::new();
        stack.push_all(vec!["a", "b", "c"]);
        assert_eq!(stack.peek_n(0), Some(&"c"));
        assert_eq!(stack.peek_n(2), Some(&"a"));
        assert_eq!(stack.peek_n(3), None);
        if let Some(item) = stack.peek_n_mut(1) {
            *item = "x";
        }
        assert_eq!(stack.iter().cloned().collect::<Vec<_>>(), vec!["a", "x", "c"]);
    }

    #[test]
    fn test_pop_empty() {
        let mut stack: Stack<i32> = Stack::default();
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
        assert_eq!(stack.peek(), None);
    }
}
