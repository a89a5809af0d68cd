//! A minimal singly linked list and an order preserving partition around a pivot.
//!
//! Every node is owned by exactly one [`Link`]. Partitioning moves nodes between
//! lists and never copies values.

use core::fmt;

/// An owning pointer to the rest of a list. `None` is the empty list.
pub type Link<T> = Option<Box<Node<T>>>;

#[derive(Debug)]
pub struct Node<T> {
    pub val: T,
    pub next: Link<T>,
}

impl<T> Node<T> {
    pub fn new(val: T) -> Self {
        Node { val, next: None }
    }
}

/// Splits the list starting at `head` into the nodes whose value is `<= value` and
/// the nodes whose value is `> value`, in that order.
///
/// Both outputs keep the relative order the nodes had in the input, and `head` is
/// left empty since all of its nodes have been moved into the outputs.
///
/// The split recurses once per node, so the stack depth grows with the list length.
///
/// ```
/// use mary_heap::list::{pivot, SinglyLinkedList};
///
/// let mut list: SinglyLinkedList<_> = [5, 1, 8, 3, 2].into_iter().collect();
/// let (smaller, larger) = pivot(list.head_mut(), &3);
///
/// let smaller = SinglyLinkedList::from(smaller);
/// let larger = SinglyLinkedList::from(larger);
/// assert_eq!(smaller.iter().copied().collect::<Vec<_>>(), [1, 3, 2]);
/// assert_eq!(larger.iter().copied().collect::<Vec<_>>(), [5, 8]);
/// assert!(list.is_empty());
/// ```
pub fn pivot<T: PartialOrd>(head: &mut Link<T>, value: &T) -> (Link<T>, Link<T>) {
    split(head.take(), value)
}

fn split<T: PartialOrd>(link: Link<T>, value: &T) -> (Link<T>, Link<T>) {
    let mut node = match link {
        Some(node) => node,
        None => return (None, None),
    };

    // The tail is split first, so prepending the current node keeps input order.
    let (mut smaller, mut larger) = split(node.next.take(), value);

    if node.val <= *value {
        node.next = smaller;
        smaller = Some(node);
    } else {
        node.next = larger;
        larger = Some(node);
    }

    (smaller, larger)
}

/// A singly linked list built from [`Node`]s.
pub struct SinglyLinkedList<T> {
    head: Link<T>,
}

impl<T> SinglyLinkedList<T> {
    #[must_use]
    pub fn new() -> Self {
        SinglyLinkedList { head: None }
    }

    pub fn push_front(&mut self, val: T) {
        let node = Box::new(Node {
            val,
            next: self.head.take(),
        });
        self.head = Some(node);
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.head.take().map(|node| {
            let node = *node;
            self.head = node.next;
            node.val
        })
    }

    pub fn front(&self) -> Option<&T> {
        self.head.as_deref().map(|node| &node.val)
    }

    /// Number of nodes. Walks the whole list.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// The raw head link, for routines that relink nodes directly such as [`pivot`].
    pub fn head_mut(&mut self) -> &mut Link<T> {
        &mut self.head
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head.as_deref(),
        }
    }

    /// Moves every node into one of two new lists, `<= value` first, leaving
    /// `self` empty. See [`pivot`].
    ///
    /// ```
    /// use mary_heap::list::SinglyLinkedList;
    ///
    /// let mut list: SinglyLinkedList<_> = [4, 9, 2, 7].into_iter().collect();
    /// let (smaller, larger) = list.pivot(&5);
    ///
    /// assert_eq!(smaller, [4, 2].into_iter().collect::<SinglyLinkedList<_>>());
    /// assert_eq!(larger, [9, 7].into_iter().collect::<SinglyLinkedList<_>>());
    /// assert!(list.is_empty());
    /// ```
    pub fn pivot(&mut self, value: &T) -> (SinglyLinkedList<T>, SinglyLinkedList<T>)
    where
        T: PartialOrd,
    {
        let (smaller, larger) = pivot(&mut self.head, value);
        (smaller.into(), larger.into())
    }
}

impl<T> Default for SinglyLinkedList<T> {
    fn default() -> Self {
        SinglyLinkedList::new()
    }
}

impl<T> Drop for SinglyLinkedList<T> {
    fn drop(&mut self) {
        // Unlink iteratively; the default recursive drop of `Box<Node>` chains
        // would overflow the stack on long lists.
        let mut cur = self.head.take();
        while let Some(mut node) = cur {
            cur = node.next.take();
        }
    }
}

impl<T> From<Link<T>> for SinglyLinkedList<T> {
    fn from(head: Link<T>) -> Self {
        SinglyLinkedList { head }
    }
}

impl<T> FromIterator<T> for SinglyLinkedList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut head = None;
        let mut tail = &mut head;
        for val in iter {
            tail = &mut tail.insert(Box::new(Node::new(val))).next;
        }
        SinglyLinkedList { head }
    }
}

impl<T: PartialEq> PartialEq for SinglyLinkedList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for SinglyLinkedList<T> {}

impl<T: fmt::Debug> fmt::Debug for SinglyLinkedList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a SinglyLinkedList<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}

/// Borrowing iterator over the values of a [`SinglyLinkedList`].
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, T> {
    next: Option<&'a Node<T>>,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter { next: self.next }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.next.map(|node| {
            self.next = node.next.as_deref();
            &node.val
        })
    }
}
