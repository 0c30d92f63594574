//! The client posting field trees.
//!
//! ```ignore
//! let client = Client::new(Configuration::default())
//!     .register_query_with("person", |input| {
//!         Query::new("person").argument("id", input).add_field("name")
//!     });
//! let person = client.query_with("person", json!(1)).await?;
//! ```

use std::fmt;
use std::sync::Arc;

use configuration::Configuration;
use configuration::ConfigurationOverrides;
use derivative::Derivative;
use field_tree::process_response;
use field_tree::FieldTreeError;
use field_tree::Mutation;
use field_tree::Operation;
use field_tree::OperationKind;
use field_tree::Query;
use field_tree::Value;
use indexmap::IndexMap;

use crate::parser::parse_response;
use crate::serializer::prepare_request;
use crate::transport::HttpTransport;
use crate::transport::Transport;
use crate::ClientError;

type QueryFactory = Arc<dyn Fn(serde_json::Value) -> Result<Query, FieldTreeError> + Send + Sync>;

type MutationFactory =
    Arc<dyn Fn(serde_json::Value) -> Result<Mutation, FieldTreeError> + Send + Sync>;

fn registered_names<F>(
    registered: &IndexMap<String, F>,
    f: &mut fmt::Formatter,
) -> Result<(), fmt::Error> {
    f.debug_list().entries(registered.keys()).finish()
}

/// Posts operations and returns their processed, frozen results.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct Client {
    configuration: Configuration,
    transport: Arc<dyn Transport>,
    #[derivative(Debug(format_with = "registered_names"))]
    queries: IndexMap<String, QueryFactory>,
    #[derivative(Debug(format_with = "registered_names"))]
    mutations: IndexMap<String, MutationFactory>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new(Configuration::default())
    }
}

impl Client {
    /// A client posting over http.
    pub fn new(configuration: Configuration) -> Self {
        Self::with_transport(configuration, Arc::new(HttpTransport::new()))
    }

    pub fn with_transport(configuration: Configuration, transport: Arc<dyn Transport>) -> Self {
        Self {
            configuration,
            transport,
            queries: IndexMap::new(),
            mutations: IndexMap::new(),
        }
    }

    pub fn set_endpoint(&mut self, endpoint: impl Into<String>) {
        self.configuration.endpoint = endpoint.into();
    }

    /// Replace the headers sent with every request.
    pub fn set_headers(&mut self, headers: IndexMap<String, String>) {
        self.configuration.headers = headers;
    }

    pub fn options(&self) -> &Configuration {
        &self.configuration
    }

    /// Post `operation` with the client configuration.
    pub async fn post<O>(&self, operation: &O) -> Result<Value, ClientError>
    where
        O: Operation + Sync + ?Sized,
    {
        self.post_with(operation, &ConfigurationOverrides::default())
            .await
    }

    /// Post `operation`, overriding parts of the client configuration for this request.
    ///
    /// The result is frozen. When the server reports errors nothing is processed.
    pub async fn post_with<O>(
        &self,
        operation: &O,
        overrides: &ConfigurationOverrides,
    ) -> Result<Value, ClientError>
    where
        O: Operation + Sync + ?Sized,
    {
        let roots = operation.roots();
        if roots.is_empty() {
            return Err(ClientError::EmptyRequest);
        }

        let configuration = self.configuration.merged(overrides);
        let request = prepare_request(&roots, operation.kind());
        tracing::debug!(kind = %operation.kind(), roots = roots.len(), "posting operation");

        let payload = self.transport.post(&request, &configuration).await?;
        let mut data = Value::from(parse_response(payload)?);

        if configuration.validate_response_shape {
            operation.response_shape().validate(&data)?;
        }

        process_response(operation, &mut data).await?;
        Ok(data)
    }

    /// Register a fixed query under `name`.
    pub fn register_query(self, name: impl Into<String>, query: Query) -> Self {
        self.register_query_with(name, move |_| Ok(query.clone()))
    }

    /// Register a query built from the input given to [`Client::query_with`].
    pub fn register_query_with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(serde_json::Value) -> Result<Query, FieldTreeError> + Send + Sync + 'static,
    {
        self.queries.insert(name.into(), Arc::new(factory));
        self
    }

    /// Register a fixed mutation under `name`.
    pub fn register_mutation(self, name: impl Into<String>, mutation: Mutation) -> Self {
        self.register_mutation_with(name, move |_| Ok(mutation.clone()))
    }

    /// Register a mutation built from the input given to [`Client::mutate_with`].
    pub fn register_mutation_with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(serde_json::Value) -> Result<Mutation, FieldTreeError> + Send + Sync + 'static,
    {
        self.mutations.insert(name.into(), Arc::new(factory));
        self
    }

    /// Names of the registered queries, in registration order.
    pub fn queries(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    /// Names of the registered mutations, in registration order.
    pub fn mutations(&self) -> impl Iterator<Item = &str> {
        self.mutations.keys().map(String::as_str)
    }

    pub async fn query(&self, name: &str) -> Result<Value, ClientError> {
        self.query_with(name, serde_json::Value::Null).await
    }

    pub async fn query_with(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<Value, ClientError> {
        let factory = self
            .queries
            .get(name)
            .ok_or_else(|| ClientError::UnknownOperation {
                kind: OperationKind::Query,
                name: name.to_owned(),
            })?;
        let query = factory(input)?;
        self.post(&query).await
    }

    pub async fn mutate(&self, name: &str) -> Result<Value, ClientError> {
        self.mutate_with(name, serde_json::Value::Null).await
    }

    pub async fn mutate_with(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<Value, ClientError> {
        let factory = self
            .mutations
            .get(name)
            .ok_or_else(|| ClientError::UnknownOperation {
                kind: OperationKind::Mutation,
                name: name.to_owned(),
            })?;
        let mutation = factory(input)?;
        self.post(&mutation).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use field_tree::BoxError;
    use field_tree::CombinedField;
    use field_tree::Field;
    use field_tree::ProcessError;
    use field_tree::ShapeError;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_log::test;

    use super::*;
    use crate::FetchError;
    use crate::Request;

    /// Answers every request with the same payload and records what was sent.
    #[derive(Debug)]
    struct StaticTransport {
        payload: serde_json::Value,
        sent: Mutex<Vec<(Request, Configuration)>>,
    }

    impl StaticTransport {
        fn new(payload: serde_json::Value) -> Arc<Self> {
            Arc::new(Self {
                payload,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<(Request, Configuration)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn post(
            &self,
            request: &Request,
            configuration: &Configuration,
        ) -> Result<serde_json::Value, FetchError> {
            self.sent
                .lock()
                .unwrap()
                .push((request.clone(), configuration.clone()));
            Ok(self.payload.clone())
        }
    }

    fn client(transport: &Arc<StaticTransport>) -> Client {
        Client::with_transport(
            Configuration::builder()
                .endpoint("http://localhost/graphql")
                .build(),
            transport.clone(),
        )
    }

    fn person() -> Query {
        Query::new("person")
            .add_field("name")
            .and_then(|query| query.add_field("surname"))
            .and_then(|query| query.add_field(Field::new("mother").add_field("name")?))
            .unwrap()
    }

    #[test(tokio::test)]
    async fn result_mirrors_the_response_and_is_frozen() {
        let data = json!({
            "person": { "name": "A", "surname": "B", "mother": { "name": "C" } }
        });
        let transport = StaticTransport::new(json!({ "data": data.clone() }));

        let result = client(&transport).post(&person()).await.unwrap();

        assert_eq!(result, data);
        assert!(result.as_object().unwrap().is_frozen());
        assert_eq!(
            transport.sent()[0].0.query,
            "query { person { name surname mother { name } } }"
        );
    }

    #[test(tokio::test)]
    async fn empty_combined_field_is_rejected_before_sending() {
        let transport = StaticTransport::new(json!({ "data": {} }));

        let error = client(&transport)
            .post(&CombinedField::new())
            .await
            .unwrap_err();

        assert!(matches!(error, ClientError::EmptyRequest));
        assert!(transport.sent().is_empty());
    }

    #[test(tokio::test)]
    async fn server_errors_skip_processing() {
        let transport = StaticTransport::new(json!({
            "data": { "car": { "brand": "Mazda" } },
            "errors": [{ "message": "partial failure" }]
        }));
        let calls = Arc::new(Mutex::new(0));
        let counted = calls.clone();
        let query = Query::new("car")
            .add_field("brand")
            .unwrap()
            .calculated("label", move |_| {
                *counted.lock().unwrap() += 1;
                Value::Null
            })
            .unwrap();

        let error = client(&transport).post(&query).await.unwrap_err();

        match error {
            ClientError::ServerReported { errors } => {
                assert_eq!(errors.iter().next().unwrap().message, "partial failure")
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test(tokio::test)]
    async fn overrides_apply_to_one_request() {
        let transport = StaticTransport::new(json!({ "data": { "car": null } }));
        let mut client = client(&transport);
        client.set_headers(IndexMap::from([(
            "authorization".to_owned(),
            "Bearer abc".to_owned(),
        )]));
        let query = Query::new("car").add_field("brand").unwrap();

        client
            .post_with(
                &query,
                &ConfigurationOverrides::builder()
                    .endpoint("http://other/graphql")
                    .headers(IndexMap::from([(
                        "x-request-id".to_owned(),
                        "1".to_owned(),
                    )]))
                    .build(),
            )
            .await
            .unwrap();
        client.post(&query).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent[0].1.endpoint, "http://other/graphql");
        assert_eq!(
            sent[0].1.headers.keys().collect::<Vec<_>>(),
            vec!["authorization", "x-request-id"]
        );
        assert_eq!(sent[1].1.endpoint, "http://localhost/graphql");
        assert_eq!(
            sent[1].1.headers.keys().collect::<Vec<_>>(),
            vec!["authorization"]
        );
    }

    #[test(tokio::test)]
    async fn set_endpoint_changes_options() {
        let transport = StaticTransport::new(json!({ "data": null }));
        let mut client = client(&transport);
        client.set_endpoint("http://changed/graphql");
        assert_eq!(client.options().endpoint, "http://changed/graphql");

        let result = client.post(&person()).await.unwrap();
        assert!(result.is_null());
        assert_eq!(transport.sent()[0].1.endpoint, "http://changed/graphql");
    }

    #[test(tokio::test)]
    async fn shape_validation_is_opt_in() {
        let transport = StaticTransport::new(json!({
            "data": { "person": { "name": "A", "age": 30 } }
        }));
        let client = client(&transport);

        assert!(client.post(&person()).await.is_ok());

        let error = client
            .post_with(
                &person(),
                &ConfigurationOverrides::builder()
                    .validate_response_shape(true)
                    .build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            ClientError::Shape(ShapeError::UnexpectedField { path }) if path == "person/age"
        ));
    }

    #[test(tokio::test)]
    async fn registered_factories_receive_their_input() {
        let transport = StaticTransport::new(json!({
            "data": { "person": { "name": "A" } }
        }));
        let client = client(&transport)
            .register_query_with("person", |input| {
                Query::new("person").argument("id", input).add_field("name")
            })
            .register_query("cars", Query::list("cars").add_field("brand").unwrap());

        let result = client.query_with("person", json!(7)).await.unwrap();

        assert_eq!(result, json!({ "person": { "name": "A" } }));
        assert_eq!(
            transport.sent()[0].0.query,
            "query { person(id: 7) { name } }"
        );
        assert_eq!(client.queries().collect::<Vec<_>>(), vec!["person", "cars"]);
    }

    #[test(tokio::test)]
    async fn registered_mutation() {
        let transport = StaticTransport::new(json!({
            "data": { "createCar": { "id": "1" } }
        }));
        let client = client(&transport).register_mutation(
            "createCar",
            Mutation::new("createCar")
                .argument("brand", "Mazda")
                .add_field("id")
                .unwrap(),
        );

        let result = client.mutate("createCar").await.unwrap();

        assert_eq!(result, json!({ "createCar": { "id": "1" } }));
        assert_eq!(
            transport.sent()[0].0.query,
            r#"mutation { createCar(brand: "Mazda") { id } }"#
        );
    }

    #[test(tokio::test)]
    async fn unknown_operations() {
        let transport = StaticTransport::new(json!({ "data": {} }));
        let client = client(&transport);

        assert!(matches!(
            client.query("missing").await,
            Err(ClientError::UnknownOperation { kind: OperationKind::Query, name }) if name == "missing"
        ));
        assert!(matches!(
            client.mutate("missing").await,
            Err(ClientError::UnknownOperation { kind: OperationKind::Mutation, .. })
        ));
    }

    #[test(tokio::test)]
    async fn factory_build_errors_are_returned() {
        let transport = StaticTransport::new(json!({ "data": {} }));
        let client = client(&transport).register_query_with("broken", |_| {
            Query::new("person").add_field("name")?.add_field("name")
        });

        assert!(matches!(
            client.query("broken").await,
            Err(ClientError::Build(FieldTreeError::DuplicateField { .. }))
        ));
        assert!(transport.sent().is_empty());
    }

    #[test(tokio::test)]
    async fn calculator_failures_name_the_field() {
        let transport = StaticTransport::new(json!({ "data": { "car": { "brand": "Mazda" } } }));
        let query = Query::new("car")
            .add_field("brand")
            .unwrap()
            .transform_async(|_| async { Err::<Value, BoxError>("lookup failed".into()) });

        let error = client(&transport).post(&query).await.unwrap_err();

        match error {
            ClientError::Process(ProcessError::Transformer { field, .. }) => {
                assert_eq!(field, "car")
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
