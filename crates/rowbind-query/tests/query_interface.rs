mod common;

use common::{table, MockSource};
use rowbind_query::{
    create_proxy, entity, query_interface, DataError, DeclaredType, Entity, MapperError,
    MappingFault, MethodSignature, ProxyFactory, QueryDescriptor, QueryEngine, QueryProxy,
    QueryReturn, ReturnShape, TypeInfo,
};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

entity! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct District {
        pub id: Option<i32>,
        pub name: Option<String>,
        pub level: Option<i32>,
        pub parent_id: Option<i32>,
        pub is_special_city: Option<i32>,
    }
}

entity! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Label {
        #[column("name")]
        pub text: String,
    }
}

entity! {
    /// Region as shown to API clients
    #[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
    pub struct Region {
        /// Primary key
        pub id: i64,
        #[serde(rename = "title")]
        #[column("name")]
        pub label: Option<String>,
    }
}

query_interface! {
    pub trait RegionDao => RegionDaoProxy {
        #[query(" select id, name from region where id = ? ")]
        /// Region by id
        #[allow(dead_code)]
        fn region(&self, id: i64) -> Option<Region>;
    }
}

query_interface! {
    pub trait DistrictDao => DistrictDaoProxy {
        #[query(" select * from district where id = ? ")]
        fn get_district_by_id(&self, id: i32) -> Vec<District>;

        /// First district with the given id
        #[query(" select * from district where id = ? ")]
        fn find_by_id(&self, id: i32) -> Option<District>;

        #[query(" select * from district where id = ? ")]
        fn get_by_id(&self, id: i32) -> District;

        #[query(" select * from district where parent_id = ? and level = ? ")]
        fn get_children(&self, parent_id: i32, level: i32) -> VecDeque<District>;

        #[query(" select name from district where name = '?' ")]
        fn labels_named(&self, name: String) -> Vec<Label>;

        fn not_queryable(&self, id: i32) -> Vec<District>;

        fn not_queryable_single(&self) -> Option<District>;

        fn not_queryable_entity(&self, id: i32) -> District;
    }
}

fn district(id: i32, name: &str, parent_id: i32) -> Vec<Value> {
    vec![json!(id), json!(name), json!(1), json!(parent_id), json!(0)]
}

const DISTRICT_COLUMNS: &[&str] = &["id", "name", "level", "parent_id", "is_special_city"];

fn proxy(source: &Arc<MockSource>) -> DistrictDaoProxy {
    create_proxy(source.clone())
}

#[tokio::test]
async fn test_executes_substituted_statement() {
    let source = Arc::new(MockSource::returning(table(
        DISTRICT_COLUMNS,
        vec![district(5, "Beijing", 0)],
    )));
    let dao = proxy(&source);

    let districts = dao.get_district_by_id(5).await.unwrap();

    assert_eq!(source.statements(), vec![" select * from district where id = 5 "]);
    assert_eq!(
        districts,
        vec![District {
            id: Some(5),
            name: Some("Beijing".to_string()),
            level: Some(1),
            parent_id: Some(0),
            is_special_city: Some(0),
        }]
    );
    assert_eq!(source.acquired(), 1);
    assert_eq!(source.released(), 1);
}

#[tokio::test]
async fn test_arguments_substituted_in_declaration_order() {
    let source = Arc::new(MockSource::returning(table(DISTRICT_COLUMNS, Vec::new())));
    let dao = proxy(&source);

    let children = dao.get_children(11, 2).await.unwrap();

    assert!(children.is_empty());
    assert_eq!(
        source.statements(),
        vec![" select * from district where parent_id = 11 and level = 2 "]
    );
}

#[tokio::test]
async fn test_rows_returned_in_result_order() {
    let source = Arc::new(MockSource::returning(table(
        DISTRICT_COLUMNS,
        vec![
            district(3, "Haidian", 1),
            district(1, "Beijing", 0),
            district(2, "Chaoyang", 1),
        ],
    )));
    let dao = proxy(&source);

    let ids: Vec<_> = dao
        .get_district_by_id(1)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.id.unwrap())
        .collect();

    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn test_method_without_descriptor_skips_data_source() {
    let source = Arc::new(MockSource::returning(table(
        DISTRICT_COLUMNS,
        vec![district(1, "Beijing", 0)],
    )));
    let dao = proxy(&source);

    assert!(dao.not_queryable(1).await.unwrap().is_empty());
    assert!(dao.not_queryable_single().await.unwrap().is_none());
    assert_eq!(dao.not_queryable_entity(1).await.unwrap(), District::default());
    assert_eq!(source.acquired(), 0);
    assert!(source.statements().is_empty());
}

#[tokio::test]
async fn test_partial_rows_on_mapping_fault() {
    let source = Arc::new(MockSource::returning(table(
        &["id", "name"],
        vec![
            vec![json!(1), json!("Beijing")],
            vec![json!("two"), json!("Tianjin")],
            vec![json!(3), json!("Shanghai")],
        ],
    )));
    let dao = proxy(&source);

    let districts = dao.get_district_by_id(1).await.unwrap();

    assert_eq!(districts.len(), 1);
    assert_eq!(districts[0].name.as_deref(), Some("Beijing"));
    assert_eq!(source.released(), 1);
}

#[tokio::test]
async fn test_unknown_column_yields_empty_sequence() {
    let source = Arc::new(MockSource::returning(table(
        &["id", "population"],
        vec![vec![json!(1), json!(21_000_000)]],
    )));
    let dao = proxy(&source);

    assert!(dao.get_district_by_id(1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_engine_reports_mapping_fault() {
    let source = Arc::new(MockSource::returning(table(
        &["id", "population"],
        vec![vec![json!(1), json!(21_000_000)]],
    )));
    let engine = QueryEngine::new(source.clone());

    let invocation = engine
        .execute::<District>("select * from district where id = ?", &["1".to_string()])
        .await
        .unwrap();

    assert_eq!(invocation.statement, "select * from district where id = 1");
    assert!(invocation.rows.is_empty());
    assert!(matches!(
        invocation.fault,
        Some(MappingFault::UnknownColumn { ref column, .. }) if column == "population"
    ));
}

#[tokio::test]
async fn test_optional_return_takes_first_row() {
    let source = Arc::new(MockSource::returning(table(
        DISTRICT_COLUMNS,
        vec![district(7, "Nanjing", 0), district(8, "Suzhou", 0)],
    )));
    let dao = proxy(&source);

    let found = dao.find_by_id(7).await.unwrap();
    assert_eq!(found.and_then(|d| d.name).as_deref(), Some("Nanjing"));
}

#[tokio::test]
async fn test_single_return_requires_a_row() {
    let source = Arc::new(MockSource::returning(table(DISTRICT_COLUMNS, Vec::new())));
    let dao = proxy(&source);

    assert!(dao.find_by_id(404).await.unwrap().is_none());

    let err = dao.get_by_id(404).await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::EmptyResult { ref method } if method == "DistrictDao::get_by_id"
    ));
}

#[tokio::test]
async fn test_single_return_maps_first_row() {
    let source = Arc::new(MockSource::returning(table(
        DISTRICT_COLUMNS,
        vec![district(9, "Hangzhou", 0)],
    )));
    let dao = proxy(&source);

    assert_eq!(dao.get_by_id(9).await.unwrap().id, Some(9));
}

#[tokio::test]
async fn test_string_argument_inserted_verbatim() {
    let source = Arc::new(MockSource::returning(table(
        &["name"],
        vec![vec![json!("what?")]],
    )));
    let dao = proxy(&source);

    let labels = dao.labels_named("what?".to_string()).await.unwrap();

    assert_eq!(
        source.statements(),
        vec![" select name from district where name = 'what?' "]
    );
    assert_eq!(labels, vec![Label { text: "what?".to_string() }]);
}

#[tokio::test]
async fn test_data_access_fault_propagates() {
    let source = Arc::new(MockSource::new(|_| {
        Err(DataError::QueryFailed("relation \"district\" does not exist".to_string()))
    }));
    let dao = proxy(&source);

    let err = dao.get_district_by_id(1).await.unwrap_err();

    assert!(matches!(err, MapperError::DataAccess(DataError::QueryFailed(_))));
    assert_eq!(source.acquired(), 1);
    assert_eq!(source.released(), 1);
}

#[tokio::test]
async fn test_acquire_fault_propagates() {
    let source = Arc::new(MockSource::failing_acquire());
    let dao = proxy(&source);

    let err = dao.get_district_by_id(1).await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::DataAccess(DataError::ConnectionFailed(_))
    ));
}

#[tokio::test]
async fn test_source_without_sql_is_not_queried() {
    let source = Arc::new(MockSource::without_capabilities());
    let dao = proxy(&source);

    let err = dao.get_district_by_id(1).await.unwrap_err();
    assert!(matches!(
        err,
        MapperError::DataAccess(DataError::OperationNotSupported(_))
    ));
    assert_eq!(source.acquired(), 0);
}

#[tokio::test]
async fn test_field_and_method_attributes_are_kept() {
    let source = Arc::new(MockSource::returning(table(
        &["id", "name"],
        vec![vec![json!(7), json!("Hebei")]],
    )));
    let dao: RegionDaoProxy = create_proxy(source.clone());

    let region = dao.region(7).await.unwrap().unwrap();

    assert_eq!(
        region,
        Region {
            id: 7,
            label: Some("Hebei".to_string())
        }
    );
    assert_eq!(Region::columns(), &["id", "name"]);
    assert_eq!(
        serde_json::to_value(&region).unwrap(),
        json!({ "id": 7, "title": "Hebei" })
    );
    assert_eq!(
        source.statements(),
        vec![" select id, name from region where id = 7 "]
    );
}

#[tokio::test]
async fn test_missing_arguments_fail_before_data_access() {
    let source = Arc::new(MockSource::returning(table(DISTRICT_COLUMNS, Vec::new())));
    let engine = QueryEngine::new(source.clone());
    let method = MethodSignature::new(
        "DistrictDao",
        "get_children",
        Some(QueryDescriptor::new(
            " select * from district where parent_id = ? and level = ? ",
        )),
        Vec::<District>::declared_type(),
    );

    let err = engine
        .invoke::<Vec<District>>(&method, vec!["1".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        MapperError::ArgumentCountMismatch {
            expected: 2,
            actual: 1
        }
    ));
    assert_eq!(source.acquired(), 0);
}

#[tokio::test]
async fn test_target_mismatch_is_rejected() {
    let source = Arc::new(MockSource::returning(table(DISTRICT_COLUMNS, Vec::new())));
    let engine = QueryEngine::new(source.clone());
    let method = MethodSignature::new(
        "DistrictDao",
        "get_district_by_id",
        Some(QueryDescriptor::new("select * from district")),
        Vec::<Label>::declared_type(),
    );

    let err = engine
        .invoke::<Vec<District>>(&method, Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, MapperError::TargetMismatch { .. }));
    assert_eq!(source.acquired(), 0);
}

#[tokio::test]
async fn test_concurrent_calls_use_separate_connections() {
    let source = Arc::new(
        MockSource::new(|sql| {
            let id = if sql.contains("parent_id") { 20 } else { 10 };
            Ok(table(DISTRICT_COLUMNS, vec![district(id, "x", 0)]))
        })
        .with_latency(Duration::from_millis(50)),
    );
    let dao = proxy(&source);

    let (by_id, children) = tokio::join!(dao.get_district_by_id(10), dao.get_children(1, 2));

    assert_eq!(by_id.unwrap()[0].id, Some(10));
    assert_eq!(children.unwrap()[0].id, Some(20));
    assert_eq!(source.acquired(), 2);
    assert_eq!(source.released(), 2);
    assert_eq!(source.max_open(), 2);
}

#[tokio::test]
async fn test_factory_builds_proxies_over_one_source() {
    let source = Arc::new(MockSource::returning(table(
        DISTRICT_COLUMNS,
        vec![district(1, "Beijing", 0)],
    )));
    let factory = ProxyFactory::new(source.clone());

    let first: DistrictDaoProxy = factory.create();
    let second: DistrictDaoProxy = factory.create();
    first.get_district_by_id(1).await.unwrap();
    second.get_district_by_id(1).await.unwrap();

    assert_eq!(source.acquired(), 2);
    assert_eq!(first.engine().source().source_type(), "mock");
}

#[tokio::test]
async fn test_proxy_usable_as_trait_object() {
    let source = Arc::new(MockSource::returning(table(
        DISTRICT_COLUMNS,
        vec![district(1, "Beijing", 0)],
    )));
    let dao: Arc<dyn DistrictDao> = Arc::new(proxy(&source));

    assert_eq!(dao.get_district_by_id(1).await.unwrap().len(), 1);
}

#[test]
fn test_signature_table() {
    let signatures = DistrictDaoProxy::signatures();
    assert_eq!(DistrictDaoProxy::INTERFACE, "DistrictDao");
    assert_eq!(signatures.len(), 8);

    let by_id = &signatures[0];
    assert_eq!(by_id.to_string(), "DistrictDao::get_district_by_id");
    assert_eq!(
        by_id.descriptor.map(|d| d.template()),
        Some(" select * from district where id = ? ")
    );

    let resolved = rowbind_query::resolve(by_id).unwrap();
    assert_eq!(resolved.target, TypeInfo::of::<District>());
    assert_eq!(resolved.shape, ReturnShape::Sequence);

    let single = rowbind_query::resolve(&signatures[2]).unwrap();
    assert_eq!(single.target, TypeInfo::of::<District>());
    assert_eq!(single.shape, ReturnShape::Single);
    assert_eq!(signatures[2].return_type, DeclaredType::plain::<District>());

    assert!(signatures[5].descriptor.is_none());
    assert!(rowbind_query::resolve(&signatures[5]).is_none());
}
