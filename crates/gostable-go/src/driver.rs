//! Result types of the Go driver calls the resolver follows.

use gostable_core::{TypeIdentity, MONGO_PACKAGE, OPTIONS_PACKAGE};

/// Package functions of `mongo` returning a handle: (function, type).
const MONGO_CONSTRUCTORS: &[(&str, &str)] = &[("Connect", "Client"), ("NewClient", "Client")];

/// Methods on `mongo` handles returning another handle: (receiver, method, type).
const MONGO_METHODS: &[(&str, &str, &str)] = &[
    ("Client", "Database", "Database"),
    ("Database", "Client", "Client"),
    ("Database", "Collection", "Collection"),
    ("Collection", "Clone", "Collection"),
    ("Collection", "Database", "Database"),
];

/// Type returned by calling `package.function`.
///
/// Builders in the options package follow the `options.Find()` ->
/// `*options.FindOptions` convention, and `MergeXOptions` returns `*XOptions`.
#[must_use]
pub fn package_function(package: &str, function: &str) -> Option<TypeIdentity> {
    match package {
        MONGO_PACKAGE => MONGO_CONSTRUCTORS
            .iter()
            .find(|(f, _)| *f == function)
            .map(|(_, ty)| TypeIdentity::pointer_to(MONGO_PACKAGE, *ty)),
        OPTIONS_PACKAGE if function.starts_with(|c: char| c.is_ascii_uppercase()) => {
            let base = function
                .strip_prefix("Merge")
                .and_then(|f| f.strip_suffix("Options"))
                .filter(|f| !f.is_empty())
                .unwrap_or(function);
            Some(TypeIdentity::pointer_to(OPTIONS_PACKAGE, format!("{base}Options")))
        }
        _ => None,
    }
}

/// Type returned by calling `method` on a value of type `receiver`.
#[must_use]
pub fn method_result(receiver: &TypeIdentity, method: &str) -> Option<TypeIdentity> {
    let named = receiver.named_type()?;
    match named.package.as_str() {
        MONGO_PACKAGE => MONGO_METHODS
            .iter()
            .find(|(recv, m, _)| *recv == named.name && *m == method)
            .map(|(_, _, ty)| TypeIdentity::pointer_to(MONGO_PACKAGE, *ty)),
        // Setters on option builders return the builder.
        OPTIONS_PACKAGE if method.starts_with("Set") => {
            Some(TypeIdentity::pointer_to(OPTIONS_PACKAGE, named.name.clone()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_builders_name_their_options_type() {
        assert_eq!(
            package_function(OPTIONS_PACKAGE, "Find"),
            Some(TypeIdentity::pointer_to(OPTIONS_PACKAGE, "FindOptions"))
        );
        assert_eq!(
            package_function(OPTIONS_PACKAGE, "MergeClientOptions"),
            Some(TypeIdentity::pointer_to(OPTIONS_PACKAGE, "ClientOptions"))
        );
        assert_eq!(package_function(OPTIONS_PACKAGE, "helper"), None);
        assert_eq!(
            package_function(MONGO_PACKAGE, "Connect"),
            Some(TypeIdentity::pointer_to(MONGO_PACKAGE, "Client"))
        );
        assert_eq!(package_function("context", "Background"), None);
    }

    #[test]
    fn handle_methods_chain() {
        let client = TypeIdentity::pointer_to(MONGO_PACKAGE, "Client");
        let db = method_result(&client, "Database").unwrap();
        let coll = method_result(&db, "Collection").unwrap();
        assert_eq!(coll, TypeIdentity::pointer_to(MONGO_PACKAGE, "Collection"));
        assert_eq!(method_result(&coll, "Find"), None);

        let find = TypeIdentity::pointer_to(OPTIONS_PACKAGE, "FindOptions");
        assert_eq!(method_result(&find, "SetMax"), Some(find.clone()));
        assert_eq!(method_result(&find, "Validate"), None);
    }
}
