//! Widgets live in a flat arena indexed by `WidgetId` rather than in an
//! owned tree, so a window can reference its owner (the desktop) and vice
//! versa without Rust fighting a cyclic ownership graph.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WidgetId(u32);

pub struct Arena<T> {
    slots: Vec<Option<T>>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn insert(&mut self, value: T) -> WidgetId {
        self.slots.push(Some(value));
        WidgetId((self.slots.len() - 1) as u32)
    }

    pub fn get(&self, id: WidgetId) -> Option<&T> {
        self.slots.get(id.0 as usize).and_then(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, id: WidgetId) -> Option<&mut T> {
        self.slots.get_mut(id.0 as usize).and_then(|s| s.as_mut())
    }

    pub fn remove(&mut self, id: WidgetId) -> Option<T> {
        self.slots.get_mut(id.0 as usize).and_then(|s| s.take())
    }

    pub fn ids(&self) -> impl Iterator<Item = WidgetId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|_| WidgetId(i as u32)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (WidgetId, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (WidgetId(i as u32), v)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (WidgetId, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|v| (WidgetId(i as u32), v)))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
