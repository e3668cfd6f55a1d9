pub mod contained;
pub mod item;
pub mod language;
pub mod metadata;
pub mod order;

pub use contained::{ContainedResource, find_contained};
pub use item::{
    AnswerOption, Coding, EnableBehavior, EnableWhen, EnableWhenOperator, Item, ItemType, Items,
};
pub use language::{
    ItemTranslation, Languages, MetadataTranslation, MetadataTranslationField, TranslatableField,
    Translation, has_translations, is_valid_language_code,
};
pub use metadata::{Metadata, PublicationStatus};
pub use order::{OrderIndex, Position};
