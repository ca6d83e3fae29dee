//! Stable API v1 tables for the MongoDB Go driver (v1 package layout).

use super::{MemberSets, PolicyTable};
use crate::resolve::NamedType;

/// Import path of the driver's `mongo` package.
pub const MONGO_PACKAGE: &str = "go.mongodb.org/mongo-driver/mongo";
/// Import path of the driver's `options` package.
pub const OPTIONS_PACKAGE: &str = "go.mongodb.org/mongo-driver/mongo/options";

const FIND_ONE_FIELDS: &[&str] = &[
    "Max",
    "MaxAwaitTime",
    "Min",
    "NoCursorTimeout",
    "OplogReplay",
    "ReturnKey",
    "ShowRecordID",
];

const MONGO_FUNCTIONS: &[(&str, &[&str])] = &[
    ("Client", &["Watch"]),
    ("Collection", &["Distinct", "SearchIndexes", "Watch"]),
    ("Database", &["Watch"]),
];

const OPTIONS_FIELDS: &[(&str, &[&str])] = &[
    (
        "CreateCollectionOptions",
        &[
            "Capped",
            "DefaultIndexOptions",
            "MaxDocuments",
            "SizeInBytes",
            "StorageEngine",
        ],
    ),
    ("FindOneAndDeleteOptions", FIND_ONE_FIELDS),
    ("FindOneAndReplaceOptions", FIND_ONE_FIELDS),
    ("FindOneAndUpdateOptions", FIND_ONE_FIELDS),
    ("FindOneOptions", FIND_ONE_FIELDS),
    (
        "FindOptions",
        &[
            "CursorType",
            "Max",
            "MaxAwaitTime",
            "Min",
            "NoCursorTimeout",
            "OplogReplay",
            "ReturnKey",
            "ShowRecordID",
        ],
    ),
    (
        "IndexOptions",
        &["Background", "BucketSize", "Sparse", "StorageEngine"],
    ),
];

const STAGES: &[&str] = &[
    "$currentOp",
    "$indexStats",
    "$listLocalSessions",
    "$listSessions",
    "$planCacheStats",
    "$search",
];

const OPERATORS: &[(&str, &[&str])] = &[
    ("$group", &["$sum", "$avg"]),
    ("$project", &["$add", "$multiply"]),
];

const STABLE_COMMANDS: &[&str] = &[
    "abortTransaction",
    "aggregate",
    "authenticate",
    "bulkWrite",
    "collMod",
    "commitTransaction",
    "count",
    "create",
    "createIndexes",
    "delete",
    "drop",
    "dropDatabase",
    "dropIndexes",
    "endSessions",
    "explain",
    "find",
    "findAndModify",
    "getMore",
    "hello",
    "insert",
    "killCursors",
    "listCollections",
    "listDatabases",
    "listIndexes",
    "ping",
    "refreshSessions",
    "update",
];

fn insert_all(sets: &mut MemberSets, package: &str, entries: &[(&str, &[&str])]) {
    for (type_name, members) in entries {
        let owner = NamedType::new(package, *type_name);
        sets.entry(owner)
            .or_default()
            .extend(members.iter().map(|m| (*m).to_string()));
    }
}

pub(super) fn stable_api_v1() -> PolicyTable {
    let mut policy = PolicyTable::empty();

    insert_all(&mut policy.functions, MONGO_PACKAGE, MONGO_FUNCTIONS);
    // Every banned options field also has a banned `Set*` builder method.
    for (type_name, fields) in OPTIONS_FIELDS {
        let setters: Vec<String> = fields.iter().map(|f| format!("Set{f}")).collect();
        policy
            .functions
            .entry(NamedType::new(OPTIONS_PACKAGE, *type_name))
            .or_default()
            .extend(setters);
    }
    insert_all(&mut policy.fields, OPTIONS_PACKAGE, OPTIONS_FIELDS);
    insert_all(
        &mut policy.constants,
        OPTIONS_PACKAGE,
        &[("CursorType", &["Tailable", "TailableAwait"])],
    );

    policy.stages.extend(STAGES.iter().map(|s| (*s).to_string()));
    for (stage, operators) in OPERATORS {
        policy
            .operators
            .entry((*stage).to_string())
            .or_default()
            .extend(operators.iter().map(|o| (*o).to_string()));
    }
    policy
        .commands
        .extend(STABLE_COMMANDS.iter().map(|c| (*c).to_string()));

    insert_all(
        &mut policy.command_entry_points,
        MONGO_PACKAGE,
        &[("Database", &["RunCommand", "RunCommandCursor"])],
    );
    insert_all(
        &mut policy.pipeline_entry_points,
        MONGO_PACKAGE,
        &[("Collection", &["Aggregate"]), ("Database", &["Aggregate"])],
    );

    policy
}
