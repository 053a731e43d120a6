//! End-to-end generation over in-memory projects.

use fngql_checker::{ConfigError, MemoryHost};
use fngql_collector::{Collector, OperationKind};
use fngql_graphql::{GenerateError, Generator, GeneratorOptions, NumberScalar, StructureError};

fn project(files: &[(&str, &str)]) -> MemoryHost {
    let mut host = MemoryHost::new().with_file("/p/tsconfig.json", "{ \"compilerOptions\": {} }");
    for (path, text) in files {
        host.insert(format!("/p/{path}"), *text);
    }
    host
}

fn generator(host: &MemoryHost) -> Generator<'_> {
    Generator::new(host, GeneratorOptions::new("/p"))
}

const MIXED: &str = r#"
export function Query(arg: string): {
  scalar: string;
  list: number[];
  nested: { value: boolean; items: string[] };
} {
  return { scalar: arg, list: [1, 2, 3], nested: { value: true, items: [arg] } };
}
"#;

/// Test the mixed scalar, list and nested fixture.
#[test]
fn test_mixed_fixture() {
    let host = project(&[("src/operations/complex/root/mixed.ts", MIXED)]);
    let artifacts = generator(&host).generate().unwrap();

    insta::assert_snapshot!(artifacts.schema, @r###"
    type ComplexRootMixed {
      scalar: String!
      list: [Int!]!
      nested: ComplexRootMixedNested!
    }

    type ComplexRootMixedNested {
      value: Boolean!
      items: [String!]!
    }

    type Query {
      complexRootMixed(arg: String!): ComplexRootMixed!
    }
    "###);

    let op = &artifacts.meta.operations[0];
    assert_eq!(op.kind, OperationKind::Query);
    assert_eq!(op.args.len(), 1);
    assert_eq!(op.args[0].name, "arg");
    assert!(artifacts.meta.resolve(op.args[0].ty).is_builtin_scalar());
    assert!(artifacts.resolvers.contains(
        "import { Query as Query_complexRootMixed } from \"../src/operations/complex/root/mixed\";"
    ));
    assert!(artifacts
        .resolvers
        .contains("complexRootMixed: makeGraphQLResolverFn(Query_complexRootMixed, [\"arg\"]),"));
}

/// Test that two runs over the same project produce identical output.
#[test]
fn test_generation_is_idempotent() {
    let host = project(&[
        ("src/models.ts", "export interface Post { id: string; tags: string[] }\n"),
        (
            "src/operations/post/get.ts",
            "import { Post } from \"../../models\";\nexport function Query(id: string): Post | null { return null; }\n",
        ),
        (
            "src/operations/post/list.ts",
            "import type { Post } from \"../../models\";\nexport async function Query(): Promise<Post[]> { return []; }\n",
        ),
    ]);
    let first = generator(&host).generate().unwrap();
    let second = generator(&host).generate().unwrap();
    assert_eq!(first.schema, second.schema);
    assert_eq!(first.resolvers, second.resolvers);
    assert_eq!(first.sdk, second.sdk);
    assert!(first.schema.contains("postGet(id: String!): Post\n"));
    assert!(first.schema.contains("postList: [Post!]!\n"));
}

/// Test that a type referenced from two operations is collected once.
#[test]
fn test_reference_count() {
    let host = project(&[
        ("src/shared.ts", "export type Point = { x: number; y: number };\n"),
        (
            "src/operations/origin.ts",
            "import { Point } from \"../shared\";\nexport function Query(): Point { return { x: 0, y: 0 }; }\n",
        ),
        (
            "src/operations/move.ts",
            "import { Point } from \"../shared\";\nexport function Mutation(dx: number): Point { return { x: dx, y: 0 }; }\n",
        ),
    ]);
    let mut collector = Collector::new();
    let meta = generator(&host).gather(&mut collector).unwrap();
    let point = meta.find("Point").unwrap();
    let identity = &meta.meta(point).identity;
    assert_eq!(collector.type_reference(identity).map(<[_]>::len), Some(2));
    assert_eq!(collector.get_type(identity), Some(point));
    assert_eq!(meta.meta(point).reference_count, 2);
}

const USER_OPERATION: &str = r#"
export const __typename = "User";

/** Looks a user up by id. */
export function Query(id: string): { id: string; name: string } {
  return { id, name: "" };
}
"#;

const USER_FIELDS: &str = r#"
/** The user's latest posts. */
export function posts(user: { id: string }, args: { limit?: number }): string[] {
  return [];
}
"#;

/// Test fields contributed by a type-extension file.
#[test]
fn test_extended_type() {
    let host = project(&[
        ("src/operations/user.ts", USER_OPERATION),
        ("src/types/User.ts", USER_FIELDS),
    ]);
    let artifacts = generator(&host).generate().unwrap();

    insta::assert_snapshot!(artifacts.schema, @r###"
    type User {
      id: String!
      name: String!
      "The user's latest posts."
      posts(limit: Int): [String!]!
    }

    type Query {
      "Looks a user up by id."
      user(id: String!): User!
    }
    "###);
    assert!(artifacts.resolvers.contains("import * as User_fields from \"../src/types/User\";"));
    assert!(artifacts
        .resolvers
        .contains("posts: makeGraphQLFieldResolver(User_fields.posts, [\"limit\"]),"));
    assert_eq!(
        artifacts.type_fragments["User"],
        "export type User = {\n  id: string;\n  name: string;\n};\n"
    );
    let ext = &artifacts.meta.extended_types[0];
    assert_eq!(ext.fields, ["posts"]);
}

/// Test that extending an undeclared type is fatal.
#[test]
fn test_missing_extended_type() {
    let host = project(&[
        ("src/operations/ping.ts", "export function Query(): string { return \"pong\"; }\n"),
        ("src/types/Ghost.ts", "export function boo(ghost: unknown): string { return \"\"; }\n"),
    ]);
    let err = generator(&host).generate().unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Structure(StructureError::MissingExtendedType { ref name, .. }) if name == "Ghost"
    ));
    assert!(err.to_string().contains("src/types/Ghost.ts"));
}

/// Test that extending a non-object type is fatal.
#[test]
fn test_extended_type_not_an_object() {
    let host = project(&[
        (
            "src/operations/role.ts",
            "type Role = \"ADMIN\" | \"VIEWER\";\nexport function Query(): Role { return \"ADMIN\"; }\n",
        ),
        ("src/types/Role.ts", "export function label(role: string): string { return role; }\n"),
    ]);
    let err = generator(&host).generate().unwrap_err();
    assert!(matches!(
        err,
        GenerateError::Structure(StructureError::NotAnObjectType { ref name, .. }) if name == "Role"
    ));
}

const SHAPE: &str = r#"
type Shape = { kind: "circle"; r: number } | { kind: "square"; s: number };

export function Query(): Shape {
  return { kind: "circle", r: 1 };
}
"#;

/// Test a discriminated union of two object shapes.
#[test]
fn test_native_union() {
    let host = project(&[("src/operations/shape.ts", SHAPE)]);
    let artifacts = generator(&host).generate().unwrap();

    insta::assert_snapshot!(artifacts.schema, @r###"
    enum Constant_circle {
      circle
    }

    enum Constant_square {
      square
    }

    union Shape = ShapeVariant1 | ShapeVariant2

    type ShapeVariant1 {
      kind: Constant_circle!
      r: Int!
    }

    type ShapeVariant2 {
      kind: Constant_square!
      s: Int!
    }

    type Query {
      shape: Shape!
    }
    "###);
    assert!(artifacts.meta.custom_scalars.is_empty());
    assert!(artifacts.sdk.contains("export type Constant_circle = \"circle\";\n"));
    assert!(artifacts.sdk.contains("export type Shape = ShapeVariant1 | ShapeVariant2;\n"));
    assert!(artifacts.sdk.contains(
        "query: \"query shape { shape { __typename ... on ShapeVariant1 { kind r } ... on ShapeVariant2 { kind s } } }\""
    ));
}

/// Test that backslashes in doc comments are escaped in the schema.
#[test]
fn test_description_with_backslash() {
    let host = project(&[(
        "src/operations/home.ts",
        r#"/** path C:\dir */ export function Query(): string { return ""; }"#,
    )]);
    let artifacts = generator(&host).generate().unwrap();
    assert_eq!(
        artifacts.schema,
        "type Query {\n  \"path C:\\\\dir\"\n  home: String!\n}\n"
    );
}

/// Test that unions in argument position become custom scalars.
#[test]
fn test_input_union_is_scalar() {
    let host = project(&[(
        "src/operations/flag.ts",
        "export function Query(value: string | boolean): boolean { return true; }\n",
    )]);
    let artifacts = generator(&host).generate().unwrap();
    assert!(artifacts.schema.contains("scalar StringOrBoolean\n"));
    assert!(artifacts
        .schema
        .contains("flag(value: StringOrBoolean!): Boolean!"));
    assert!(!artifacts.schema.contains("union "));
}

/// Test that files without an operation export are ignored.
#[test]
fn test_non_operation_files_are_skipped() {
    let host = project(&[
        ("src/operations/ping.ts", "export function Query(): string { return \"pong\"; }\n"),
        ("src/operations/util.ts", "export function format(s: string): string { return s; }\n"),
    ]);
    let artifacts = generator(&host).generate().unwrap();
    assert_eq!(artifacts.meta.operations.len(), 1);
    assert_eq!(artifacts.schema, "type Query {\n  ping: String!\n}\n");
}

/// Test that unresolvable properties are dropped with a warning.
#[test]
fn test_unresolvable_property_warning() {
    let host = project(&[(
        "src/operations/item.ts",
        "interface Item { id: string; owner: Missing }\nexport function Query(): Item { return null!; }\n",
    )]);
    let artifacts = generator(&host).generate().unwrap();
    assert!(artifacts.schema.contains("type Item {\n  id: String!\n}"));
    assert!(artifacts
        .meta
        .warnings
        .iter()
        .any(|w| w.path.as_deref() == Some("item.return.owner")));
}

/// Test that a schema without a query root is reported with its text.
#[test]
fn test_invalid_schema() {
    let host = project(&[(
        "src/operations/reset.ts",
        "export function Mutation(): boolean { return true; }\n",
    )]);
    let err = generator(&host).generate().unwrap_err();
    let GenerateError::InvalidSchema { schema, problems } = err else {
        panic!("expected an invalid schema, got {err}");
    };
    assert_eq!(schema, "type Mutation {\n  reset: Boolean!\n}\n");
    assert_eq!(problems.len(), 1);
}

/// Test that a missing tsconfig.json is a configuration error.
#[test]
fn test_missing_tsconfig() {
    let host = MemoryHost::new().with_file(
        "/p/src/operations/ping.ts",
        "export function Query(): string { return \"pong\"; }\n",
    );
    let err = generator(&host).generate().unwrap_err();
    assert!(matches!(err, GenerateError::Config(ConfigError::MissingTsconfig(_))));
}

/// Test the float number scalar option.
#[test]
fn test_float_numbers() {
    let host = project(&[(
        "src/operations/ratio.ts",
        "export function Query(a: number, b?: number): number { return a / (b ?? 1); }\n",
    )]);
    let mut options = GeneratorOptions::new("/p");
    options.number_scalar = NumberScalar::Float;
    let artifacts = Generator::new(&host, options).generate().unwrap();
    assert_eq!(artifacts.schema, "type Query {\n  ratio(a: Float!, b: Float): Float!\n}\n");
}

/// Test subscription wiring and SDK output.
#[test]
fn test_subscription_and_sdk() {
    let host = project(&[
        ("src/operations/ping.ts", "export function Query(): string { return \"pong\"; }\n"),
        (
            "src/operations/clock.ts",
            "export async function* Subscription(): AsyncGenerator<{ now: string }> { yield { now: \"\" }; }\n",
        ),
    ]);
    let artifacts = generator(&host).generate().unwrap();
    assert!(artifacts.schema.contains("type Subscription {\n  clock: Clock!\n}"));
    assert!(artifacts.resolvers.contains(
        "clock: { subscribe: makeGraphQLResolverFn(Subscription_clock, []), resolve: (payload: unknown) => payload },"
    ));
    assert!(artifacts.sdk.contains("export type ClockSubscriptionArgs = Record<string, never>;"));
    assert!(artifacts
        .sdk
        .contains("return { query: \"subscription clock { clock { now } }\", variables };"));
}
