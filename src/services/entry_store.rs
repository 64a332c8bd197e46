use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::card::CanonicalCard;
use crate::models::world_info::WorldInfoBook;

/// Ownership scope of a registered book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookScope {
    Global,
    Character(String),
}

/// A book registered with the store, plus bookkeeping metadata.
#[derive(Debug, Clone)]
pub struct StoredBook {
    pub id: Uuid,
    pub scope: BookScope,
    pub book: WorldInfoBook,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("book '{book}' has duplicate entry ids: {ids:?}")]
    DuplicateEntryIds { book: String, ids: Vec<i32> },
    #[error("no book registered under id {0}")]
    BookNotFound(Uuid),
}

/// Holds the registered world-info books. The editor's mutation path and
/// the engine's read path synchronize here; reads hand out clones, so one
/// activation call never observes a partial edit.
#[derive(Debug, Default)]
pub struct EntryStore {
    inner: RwLock<Vec<StoredBook>>,
}

impl EntryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a book. Books violating the unique-entry-id invariant are
    /// rejected whole; ids repeating across different books are fine.
    #[instrument(skip(self, book), fields(book_name = %book.name))]
    pub fn insert_book(&self, book: WorldInfoBook, scope: BookScope) -> Result<Uuid, StoreError> {
        let dupes = book.duplicate_ids();
        if !dupes.is_empty() {
            return Err(StoreError::DuplicateEntryIds {
                book: book.name.clone(),
                ids: dupes,
            });
        }
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.write_guard().push(StoredBook {
            id,
            scope,
            book,
            created_at: now,
            updated_at: now,
        });
        info!(%id, "registered world-info book");
        Ok(id)
    }

    /// Swaps a registered book's contents, keeping its id and scope.
    #[instrument(skip(self, book))]
    pub fn replace_book(&self, id: Uuid, book: WorldInfoBook) -> Result<(), StoreError> {
        let dupes = book.duplicate_ids();
        if !dupes.is_empty() {
            return Err(StoreError::DuplicateEntryIds {
                book: book.name.clone(),
                ids: dupes,
            });
        }
        let mut books = self.write_guard();
        let stored = books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::BookNotFound(id))?;
        stored.book = book;
        stored.updated_at = Utc::now();
        info!(%id, "replaced world-info book");
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn remove_book(&self, id: Uuid) -> Result<WorldInfoBook, StoreError> {
        let mut books = self.write_guard();
        let index = books
            .iter()
            .position(|b| b.id == id)
            .ok_or(StoreError::BookNotFound(id))?;
        let stored = books.remove(index);
        info!(%id, "removed world-info book");
        Ok(stored.book)
    }

    #[must_use]
    pub fn book(&self, id: Uuid) -> Option<StoredBook> {
        self.read_guard().iter().find(|b| b.id == id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    /// Stable snapshot of the books one activation call scans, in scan
    /// order: selected global books, then character-attached books (store
    /// books scoped to the character, the card's embedded book, and the
    /// store book named by the card's `world` extension), unless
    /// `character_books_first` swaps the two groups.
    #[must_use]
    pub fn resolve_active_books(
        &self,
        card: Option<&CanonicalCard>,
        global_selection: &[String],
        character_books_first: bool,
    ) -> Vec<WorldInfoBook> {
        let books = self.read_guard();

        let mut global: Vec<WorldInfoBook> = Vec::new();
        for name in global_selection {
            for stored in books
                .iter()
                .filter(|b| b.scope == BookScope::Global && &b.book.name == name)
            {
                global.push(stored.book.clone());
            }
        }

        let mut character: Vec<WorldInfoBook> = Vec::new();
        if let Some(card) = card {
            if let Some(char_name) = card.name.as_deref() {
                for stored in books.iter().filter(
                    |b| matches!(&b.scope, BookScope::Character(owner) if owner == char_name),
                ) {
                    character.push(stored.book.clone());
                }
            }
            if let Some(book) = &card.character_book {
                character.push(book.clone());
            }
            if let Some(world) = card.extensions.world.as_deref() {
                // A world link already covered by the global selection is not
                // scanned twice.
                if !global_selection.iter().any(|n| n == world) {
                    for stored in books
                        .iter()
                        .filter(|b| b.scope == BookScope::Global && b.book.name == world)
                    {
                        character.push(stored.book.clone());
                    }
                }
            }
        }

        if character_books_first {
            character.extend(global);
            character
        } else {
            global.extend(character);
            global
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Vec<StoredBook>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<StoredBook>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
