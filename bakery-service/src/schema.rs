diesel::table! {
    cakes (id) {
        id -> Uuid,
        name -> Varchar,
        flavor -> Varchar,
        size -> Varchar,
        price -> Numeric,
        stock -> Int4,
        category -> Varchar,
        description -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    inventory (id) {
        id -> Uuid,
        item_name -> Varchar,
        category -> Varchar,
        quantity -> Float8,
        unit -> Varchar,
        min_stock_level -> Float8,
        last_updated -> Timestamptz,
    }
}

diesel::table! {
    order_status_history (id) {
        id -> Uuid,
        order_id -> Uuid,
        status -> Varchar,
        changed_at -> Timestamptz,
        notes -> Nullable<Text>,
        seq -> Int8,
    }
}

diesel::table! {
    orders (id) {
        id -> Uuid,
        customer_id -> Nullable<Uuid>,
        customer_name -> Varchar,
        cake_id -> Uuid,
        quantity -> Int4,
        total_price -> Numeric,
        status -> Varchar,
        created_at -> Timestamptz,
        delivery_date -> Nullable<Timestamp>,
        special_instructions -> Nullable<Text>,
        delivery_type -> Varchar,
        address -> Nullable<Text>,
        phone -> Nullable<Varchar>,
        email -> Nullable<Varchar>,
    }
}

diesel::table! {
    users (id) {
        id -> Uuid,
        username -> Varchar,
        password_hash -> Varchar,
        role -> Varchar,
        name -> Varchar,
        email -> Varchar,
        phone -> Nullable<Varchar>,
        status -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(order_status_history -> orders (order_id));

diesel::allow_tables_to_appear_in_same_query!(
    cakes,
    inventory,
    order_status_history,
    orders,
    users,
);
