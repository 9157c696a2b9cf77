pub mod elasticsearch;
pub mod entity_recognition;
pub mod intent_detection;
pub mod query_expansion;
pub mod query_processor;
pub mod search;
pub mod thesaurus;
pub mod tokenizer;

pub use elasticsearch::ElasticsearchClient;
pub use entity_recognition::EntityRecognitionService;
pub use intent_detection::IntentDetectionService;
pub use query_expansion::QueryExpansionService;
pub use query_processor::QueryProcessor;
pub use search::SearchService;
pub use thesaurus::ThesaurusClient;
pub use tokenizer::Tokenizer;
