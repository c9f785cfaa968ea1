use crate::{config::DatabaseConfig, constants::*};
use futures::stream::StreamExt;
use mongodb::bson::Document;
use mongodb::error::Result as MongoResult;
use mongodb::options::{
    FindOneAndUpdateOptions, FindOneOptions, FindOptions, UpdateOptions,
};
use mongodb::{options::ClientOptions, Client};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

pub struct AppDatabase(Client);

/// Document counts reported by an update
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UpdateCount {
    pub matched: u64,
    pub modified: u64,
}

#[cfg_attr(test, automock)]
impl AppDatabase {
    pub async fn new(config: DatabaseConfig) -> MongoResult<Self> {
        let timeout = Duration::from_secs(MONGO_CONN_TIMEOUT);
        // create the mongodb client options
        let mut client_options = ClientOptions::parse(config.uri).await?;
        client_options.max_pool_size = Some(config.max_pool_size);
        client_options.min_pool_size = Some(config.min_pool_size);
        client_options.connect_timeout = Some(timeout);
        // create the client and return Result object
        let client = Client::with_options(client_options)?;
        let app_db = Self(client);
        Ok(app_db)
    }

    pub async fn find_one<T>(
        &self,
        db: &str,
        coll: &str,
        filter: Option<Document>,
        options: Option<FindOneOptions>,
    ) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync + 'static,
    {
        let coll = self.0.database(db).collection::<T>(coll);
        coll.find_one(filter, options).await
    }

    pub async fn find<T>(
        &self,
        db: &str,
        coll: &str,
        filter: Option<Document>,
        options: Option<FindOptions>,
    ) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync + 'static,
    {
        let coll = self.0.database(db).collection::<T>(coll);
        let mut cursor = coll.find(filter, options).await?;
        let mut data = vec![];
        while let Some(doc) = cursor.next().await {
            data.push(doc?);
        }
        Ok(data)
    }

    pub async fn update_one(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> MongoResult<UpdateCount> {
        let coll = self.0.database(db).collection::<Document>(coll);
        let result = coll.update_one(filter, update, options).await?;
        Ok(UpdateCount {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    pub async fn update_many(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        update: Document,
        options: Option<UpdateOptions>,
    ) -> MongoResult<UpdateCount> {
        let coll = self.0.database(db).collection::<Document>(coll);
        let result = coll.update_many(filter, update, options).await?;
        Ok(UpdateCount {
            matched: result.matched_count,
            modified: result.modified_count,
        })
    }

    /// Single document atomic read-modify-write
    pub async fn find_one_and_update<T>(
        &self,
        db: &str,
        coll: &str,
        filter: Document,
        update: Document,
        options: Option<FindOneAndUpdateOptions>,
    ) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync + 'static,
    {
        let coll = self.0.database(db).collection::<T>(coll);
        coll.find_one_and_update(filter, update, options).await
    }
}
