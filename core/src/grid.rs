use crate::*;

/// One slot of the wall. Locked until an image is applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    index: CellIndex,
    image: Option<Thumbnail>,
}

impl Cell {
    const fn new(index: CellIndex) -> Self {
        Self { index, image: None }
    }

    pub const fn index(&self) -> CellIndex {
        self.index
    }

    pub fn image(&self) -> Option<&Thumbnail> {
        self.image.as_ref()
    }

    pub const fn is_locked(&self) -> bool {
        self.image.is_none()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    NoChange,
    Unlocked,
    Replaced,
}

impl ApplyOutcome {
    pub const fn has_update(self) -> bool {
        !matches!(self, Self::NoChange)
    }
}

/// In-memory cache of the store mapping, one [`Cell`] per index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(cell_count: CellIndex) -> Self {
        Self {
            cells: (0..cell_count).map(Cell::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell(&self, index: CellIndex) -> Option<&Cell> {
        self.cells.get(usize::from(index))
    }

    pub fn contains(&self, index: CellIndex) -> bool {
        usize::from(index) < self.cells.len()
    }

    /// Unknown indices count as locked.
    pub fn is_locked(&self, index: CellIndex) -> bool {
        self.cell(index).is_none_or(Cell::is_locked)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn unlocked_count(&self) -> usize {
        self.cells.iter().filter(|cell| !cell.is_locked()).count()
    }

    /// Sets the image of a cell, replacing whatever was shown before. Last write wins.
    pub fn apply(
        &mut self,
        index: CellIndex,
        image: Thumbnail,
    ) -> core::result::Result<ApplyOutcome, SessionError> {
        let cell = self
            .cells
            .get_mut(usize::from(index))
            .ok_or(SessionError::InvalidCell(index))?;

        Ok(match cell.image.replace(image) {
            None => ApplyOutcome::Unlocked,
            Some(previous) if Some(&previous) == cell.image.as_ref() => ApplyOutcome::NoChange,
            Some(_) => ApplyOutcome::Replaced,
        })
    }
}
