//! Collected-item tally. Keeps first-collected order so the on-screen listing is stable.

/// Item name → count, in the order each name was first collected. Every count is at least one
/// because an entry only exists once something was collected under that name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<(String, u32)>,
}

impl Inventory {
    /// Records one collection of `name` and returns the new count.
    pub fn collect(&mut self, name: &str) -> u32 {
        if let Some((_, count)) = self.entries.iter_mut().find(|(key, _)| key == name) {
            *count += 1;
            return *count;
        }
        self.entries.push((name.to_owned(), 1));
        1
    }

    pub fn count(&self, name: &str) -> u32 {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map_or(0, |(_, count)| *count)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(name, count)| (name.as_str(), *count))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Text for the inventory panel: a heading followed by one `name: count` line per item.
    pub fn render(&self) -> String {
        let mut text = String::from("Inventory:\n");
        for (name, count) in self.iter() {
            text.push_str(name);
            text.push_str(": ");
            text.push_str(&count.to_string());
            text.push('\n');
        }
        text
    }
}
