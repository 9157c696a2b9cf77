use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::routes::api_routes;
use crate::services::{
    ElasticsearchClient, EntityRecognitionService, IntentDetectionService, QueryExpansionService,
    QueryProcessor, SearchService, ThesaurusClient, Tokenizer,
};

const LEXICON_SEED_SIZE: usize = 200;

pub struct Application {
    config: Config,
}

impl Application {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))?;
        self.run_with_listener(listener).await
    }

    pub async fn run_with_listener(self, listener: TcpListener) -> Result<()> {
        let config = self.config;

        let search_index = Arc::new(ElasticsearchClient::new(
            &config.elasticsearch_url,
            &config.product_index,
        ));
        let thesaurus = config
            .thesaurus_url
            .as_deref()
            .map(|url| Arc::new(ThesaurusClient::new(url)));

        let mut entities = EntityRecognitionService::new();
        seed_lexicons(&search_index, &mut entities).await;

        let expansion = QueryExpansionService::new(
            thesaurus,
            Some(search_index.clone()),
            config.nlp.enable_query_expansion,
            config.nlp.enable_significant_terms,
            config.nlp.max_synonyms_per_term,
            config.nlp.max_expansion_terms,
        );

        let processor = Arc::new(QueryProcessor::new(
            Tokenizer::new(config.nlp.min_token_length),
            entities,
            IntentDetectionService::new(config.nlp.intent_confidence_threshold),
            expansion,
            config.nlp.cache_ttl,
        ));

        let search_service = web::Data::new(SearchService::new(search_index, processor));

        info!("Starting server on {}", listener.local_addr()?);

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .app_data(search_service.clone())
                .service(api_routes())
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}

/// Extend the built-in category and brand lexicons with what the product
/// index actually contains. A missing or empty index is not fatal; the
/// built-in lexicons still apply.
async fn seed_lexicons(search_index: &ElasticsearchClient, entities: &mut EntityRecognitionService) {
    match search_index
        .terms_aggregation("categories", LEXICON_SEED_SIZE)
        .await
    {
        Ok(categories) => {
            info!("Seeded {} categories from the product index", categories.len());
            entities.add_categories(categories);
        }
        Err(err) => warn!("Could not seed category lexicon: {err}"),
    }

    match search_index
        .terms_aggregation("brand_name", LEXICON_SEED_SIZE)
        .await
    {
        Ok(brands) => {
            info!("Seeded {} brands from the product index", brands.len());
            entities.add_brands(brands);
        }
        Err(err) => warn!("Could not seed brand lexicon: {err}"),
    }
}
