use rowbind_query::{entity, query_interface};
use serde::Serialize;

entity! {
    /// Administrative district row
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct District {
        pub id: Option<i32>,
        pub name: Option<String>,
        pub level: Option<i32>,
        pub parent_id: Option<i32>,
        pub is_special_city: Option<i32>,
    }
}

query_interface! {
    /// Lookups over the `district` table
    pub trait DistrictDao => DistrictDaoProxy {
        #[query(" select * from district where id = ? ")]
        fn get_district_by_id(&self, id: i32) -> Vec<District>;

        #[query(" select * from district where id = ? ")]
        fn get_by_id(&self, id: i32) -> Option<District>;

        #[query(" select * from district where parent_id = ? order by id ")]
        fn get_list_by_parent_id(&self, parent_id: i32) -> Vec<District>;

        /// Exact name match. The name is inserted verbatim between quotes.
        #[query(" select * from district where name = '?' order by id ")]
        fn find_by_name(&self, name: String) -> Vec<District>;
    }
}
