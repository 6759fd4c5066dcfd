//! Fixed-size, ordered inventory

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::items::ItemRegister;
use crate::INVENTORY_SLOTS;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Item register code; 0 marks an empty slot
    pub code: u16,
    pub name: String,
    pub icon: u16,
}

impl InventoryItem {
    pub fn is_empty(&self) -> bool {
        self.code == 0
    }
}

impl From<&ItemRegister> for InventoryItem {
    fn from(item: &ItemRegister) -> Self {
        Self {
            code: item.code,
            name: item.name.clone(),
            icon: item.icon,
        }
    }
}

/// Occupied slots always form a prefix; removal shifts the tail left
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    slots: Vec<InventoryItem>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            slots: vec![InventoryItem::default(); INVENTORY_SLOTS],
        }
    }
}

impl Inventory {
    /// Rebuild from saved slots, padding or truncating to the fixed size
    pub fn from_slots(mut slots: Vec<InventoryItem>) -> Self {
        slots.resize(INVENTORY_SLOTS, InventoryItem::default());
        Self { slots }
    }

    pub fn slots(&self) -> &[InventoryItem] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.iter().take_while(|s| !s.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, code: u16) -> bool {
        self.position_of(code).is_some()
    }

    pub fn position_of(&self, code: u16) -> Option<usize> {
        if code == 0 {
            return None;
        }
        self.slots.iter().position(|s| s.code == code)
    }

    /// Append to the first free slot; returns its index
    pub fn add(&mut self, item: InventoryItem) -> Result<usize> {
        let index = self
            .slots
            .iter()
            .position(InventoryItem::is_empty)
            .ok_or(SceneError::InventoryFull)?;
        tracing::debug!(code = item.code, index, "item added to inventory");
        self.slots[index] = item;
        Ok(index)
    }

    /// Remove the item at `index`, shifting later items left
    pub fn remove_at(&mut self, index: usize) -> Option<InventoryItem> {
        if index >= self.slots.len() || self.slots[index].is_empty() {
            return None;
        }
        let removed = self.slots.remove(index);
        self.slots.push(InventoryItem::default());
        Some(removed)
    }

    pub fn remove_code(&mut self, code: u16) -> Option<InventoryItem> {
        let index = self.position_of(code)?;
        self.remove_at(index)
    }

    /// Swap the item in an occupied slot for another, keeping its position
    pub fn replace(&mut self, index: usize, item: InventoryItem) -> Option<InventoryItem> {
        let slot = self.slots.get_mut(index).filter(|s| !s.is_empty())?;
        Some(std::mem::replace(slot, item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(code: u16) -> InventoryItem {
        InventoryItem {
            code,
            name: format!("item {code}"),
            icon: code,
        }
    }

    #[test]
    fn removal_compacts_and_keeps_order() {
        let mut inv = Inventory::default();
        for code in [10, 20, 30, 40] {
            inv.add(item(code)).unwrap();
        }
        assert_eq!(inv.remove_at(1).map(|i| i.code), Some(20));
        let codes: Vec<u16> = inv.slots().iter().take(4).map(|s| s.code).collect();
        assert_eq!(codes, vec![10, 30, 40, 0]);
        assert_eq!(inv.len(), 3);
        assert_eq!(inv.slots().len(), INVENTORY_SLOTS);
    }

    #[test]
    fn full_inventory_rejects_items() {
        let mut inv = Inventory::default();
        for code in 1..=INVENTORY_SLOTS as u16 {
            inv.add(item(code)).unwrap();
        }
        assert!(matches!(inv.add(item(99)), Err(SceneError::InventoryFull)));
    }

    #[test]
    fn replace_keeps_position() {
        let mut inv = Inventory::default();
        inv.add(item(1)).unwrap();
        inv.add(item(2)).unwrap();
        assert_eq!(inv.replace(0, item(7)).map(|i| i.code), Some(1));
        assert_eq!(inv.position_of(7), Some(0));
        assert!(inv.replace(5, item(8)).is_none());
        assert_eq!(inv.remove_code(2).map(|i| i.code), Some(2));
        assert!(!inv.contains(2));
    }
}
