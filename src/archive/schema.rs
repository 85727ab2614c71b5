//! Diesel table definitions for the settlement archive.

diesel::table! {
    markets (key) {
        key -> Text,
        feed_id -> Text,
        start_ts -> BigInt,
        end_ts -> BigInt,
        start_price -> BigInt,
        start_expo -> Integer,
        start_conf -> BigInt,
        start_publish_time -> BigInt,
        end_price -> Nullable<BigInt>,
        end_expo -> Nullable<Integer>,
        end_conf -> Nullable<BigInt>,
        end_publish_time -> Nullable<BigInt>,
        total_up -> BigInt,
        total_down -> BigInt,
        status -> Text,
        result -> Text,
        updated_at -> Text,
    }
}

diesel::table! {
    positions (market_key, user_id) {
        market_key -> Text,
        user_id -> Text,
        up_net -> BigInt,
        down_net -> BigInt,
        claimed -> Bool,
        updated_at -> Text,
    }
}

diesel::table! {
    activity (id) {
        id -> Text,
        ts -> Text,
        kind -> Text,
        market_key -> Text,
        user_id -> Nullable<Text>,
        side -> Nullable<Text>,
        gross -> Nullable<BigInt>,
        fee -> Nullable<BigInt>,
        net -> Nullable<BigInt>,
        payout -> Nullable<BigInt>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(markets, positions, activity);
