diesel::table! {
    resources (id) {
        id -> Uuid,
        name -> Varchar,
        total_quota -> Int4,
        available_quota -> Int4,
        version -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    reservations (id) {
        id -> Uuid,
        resource_id -> Uuid,
        requester_id -> Varchar,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    resources,
    reservations,
);
