//! Declaration macros for entities and query interfaces.

/// Declare a struct that result rows map into.
///
/// Each field is filled from the column of the same name, or from the column
/// named in a `#[column("...")]` tag. Other field attributes (doc comments,
/// `#[serde(...)]`) are kept on the generated struct. The struct must
/// implement `Default`.
///
/// ```
/// rowbind_query::entity! {
///     #[derive(Debug, Default)]
///     pub struct District {
///         pub id: Option<i32>,
///         /// Display name
///         pub name: Option<String>,
///         #[column("parent_id")]
///         pub parent: Option<i32>,
///     }
/// }
///
/// use rowbind_query::Entity;
/// assert_eq!(District::columns(), &["id", "name", "parent_id"]);
/// ```
#[macro_export]
macro_rules! entity {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $($body:tt)*
        }
    ) => {
        $crate::__entity! {
            @parse [$(#[$meta])*] [$vis] $name
            fields: []
            attrs: []
            column: []
            rest: [$($body)*]
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __entity {
    // Column tag, consumed here and never emitted
    (
        @parse $head:tt $vis:tt $name:ident
        fields: $fields:tt
        attrs: $attrs:tt
        column: $previous:tt
        rest: [#[column($column:literal)] $($rest:tt)*]
    ) => {
        $crate::__entity! {
            @parse $head $vis $name
            fields: $fields
            attrs: $attrs
            column: [$column]
            rest: [$($rest)*]
        }
    };

    // Any other field attribute is passed through
    (
        @parse $head:tt $vis:tt $name:ident
        fields: $fields:tt
        attrs: [$($attr:tt)*]
        column: $column:tt
        rest: [#[$fmeta:meta] $($rest:tt)*]
    ) => {
        $crate::__entity! {
            @parse $head $vis $name
            fields: $fields
            attrs: [$($attr)* #[$fmeta]]
            column: $column
            rest: [$($rest)*]
        }
    };

    (
        @parse $head:tt $vis:tt $name:ident
        fields: $fields:tt
        attrs: []
        column: []
        rest: []
    ) => {
        $crate::__entity! { @emit $head $vis $name $fields }
    };

    (
        @parse $head:tt $vis:tt $name:ident
        fields: [$($done:tt)*]
        attrs: $attrs:tt
        column: $column:tt
        rest: [$fvis:vis $field:ident : $fty:ty $(, $($rest:tt)*)?]
    ) => {
        $crate::__entity! {
            @parse $head $vis $name
            fields: [$($done)* { $attrs [$fvis] $field [$fty] $column }]
            attrs: []
            column: []
            rest: [$($($rest)*)?]
        }
    };

    (
        @emit [$(#[$meta:meta])*] [$vis:vis] $name:ident
        [$({ [$($fattr:tt)*] [$fvis:vis] $field:ident [$fty:ty] [$($column:literal)?] })*]
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $($fattr)* $fvis $field: $fty, )*
        }

        impl $crate::Entity for $name {
            fn columns() -> &'static [&'static str] {
                &[ $( $crate::__column_name!($field $(, $column)?) ),* ]
            }

            #[allow(unused_variables)]
            fn assign(
                &mut self,
                column: &str,
                value: &$crate::__private::Value,
            ) -> ::std::result::Result<(), $crate::MappingFault> {
                $(
                    if column == $crate::__column_name!($field $(, $column)?) {
                        return $crate::mapper::assign_field(
                            &mut self.$field,
                            column,
                            ::std::any::type_name::<Self>(),
                            value,
                        );
                    }
                )*
                ::std::result::Result::Err($crate::MappingFault::UnknownColumn {
                    column: column.to_string(),
                    target: ::std::any::type_name::<Self>(),
                })
            }
        }

        impl $crate::QueryReturn for $name {
            type Target = $name;

            fn declared_type() -> $crate::DeclaredType {
                $crate::DeclaredType::plain::<$name>()
            }

            fn empty() -> Self {
                <$name as ::std::default::Default>::default()
            }

            fn from_rows(
                method: &$crate::MethodSignature,
                rows: ::std::vec::Vec<$name>,
            ) -> $crate::MapperResult<Self> {
                $crate::descriptor::first_row(method, rows)
            }
        }
    };
}

/// Declare a query interface and the adapter that executes it.
///
/// `trait Name => Adapter { ... }` generates the async trait `Name`, the
/// adapter struct `Adapter` implementing it, and a [`QueryProxy`] impl so the
/// adapter can be built by [`ProxyFactory`]. Methods tagged with
/// `#[query("...")]` run their template with `?` placeholders replaced by the
/// call arguments in order. Untagged methods never touch the data source and
/// return the empty value of their return type: an empty collection, `None`,
/// or the entity's `Default`. Other method attributes stay on the trait.
///
/// [`QueryProxy`]: crate::QueryProxy
/// [`ProxyFactory`]: crate::ProxyFactory
#[macro_export]
macro_rules! query_interface {
    (
        $(#[$meta:meta])*
        $vis:vis trait $iface:ident => $proxy:ident {
            $($body:tt)*
        }
    ) => {
        $crate::__query_interface! {
            @parse [$(#[$meta])*] [$vis] $iface $proxy
            methods: []
            attrs: []
            template: []
            rest: [$($body)*]
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __query_interface {
    (
        @parse $head:tt $vis:tt $iface:ident $proxy:ident
        methods: $methods:tt
        attrs: $attrs:tt
        template: $previous:tt
        rest: [#[query($template:literal)] $($rest:tt)*]
    ) => {
        $crate::__query_interface! {
            @parse $head $vis $iface $proxy
            methods: $methods
            attrs: $attrs
            template: [$template]
            rest: [$($rest)*]
        }
    };

    (
        @parse $head:tt $vis:tt $iface:ident $proxy:ident
        methods: $methods:tt
        attrs: [$($attr:tt)*]
        template: $template:tt
        rest: [#[$mmeta:meta] $($rest:tt)*]
    ) => {
        $crate::__query_interface! {
            @parse $head $vis $iface $proxy
            methods: $methods
            attrs: [$($attr)* #[$mmeta]]
            template: $template
            rest: [$($rest)*]
        }
    };

    (
        @parse $head:tt $vis:tt $iface:ident $proxy:ident
        methods: $methods:tt
        attrs: []
        template: []
        rest: []
    ) => {
        $crate::__query_interface! { @emit $head $vis $iface $proxy $methods }
    };

    (
        @parse $head:tt $vis:tt $iface:ident $proxy:ident
        methods: [$($done:tt)*]
        attrs: $attrs:tt
        template: $template:tt
        rest: [
            fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)* $(,)?) -> $ret:ty;
            $($rest:tt)*
        ]
    ) => {
        $crate::__query_interface! {
            @parse $head $vis $iface $proxy
            methods: [$($done)* { $attrs $template $method [$($arg : $arg_ty),*] [$ret] }]
            attrs: []
            template: []
            rest: [$($rest)*]
        }
    };

    (
        @emit [$(#[$meta:meta])*] [$vis:vis] $iface:ident $proxy:ident
        [$({
            [$($mattr:tt)*]
            [$($template:literal)?]
            $method:ident
            [$($arg:ident : $arg_ty:ty),*]
            [$ret:ty]
        })*]
    ) => {
        $(#[$meta])*
        #[$crate::__private::async_trait]
        $vis trait $iface: Send + Sync {
            $(
                $($mattr)*
                async fn $method(&self $(, $arg: $arg_ty)*) -> $crate::MapperResult<$ret>;
            )*
        }

        #[doc = concat!("Adapter executing the queries declared on [`", stringify!($iface), "`].")]
        #[derive(Clone)]
        $vis struct $proxy {
            engine: $crate::QueryEngine,
        }

        impl $crate::QueryProxy for $proxy {
            const INTERFACE: &'static str = stringify!($iface);

            fn from_engine(engine: $crate::QueryEngine) -> Self {
                Self { engine }
            }

            fn engine(&self) -> &$crate::QueryEngine {
                &self.engine
            }

            fn signatures() -> ::std::vec::Vec<$crate::MethodSignature> {
                ::std::vec![
                    $(
                        $crate::MethodSignature::new(
                            stringify!($iface),
                            stringify!($method),
                            $crate::__descriptor!($($template)?),
                            <$ret as $crate::QueryReturn>::declared_type(),
                        ),
                    )*
                ]
            }
        }

        #[$crate::__private::async_trait]
        impl $iface for $proxy {
            $(
                async fn $method(&self $(, $arg: $arg_ty)*) -> $crate::MapperResult<$ret> {
                    let signature = $crate::MethodSignature::new(
                        stringify!($iface),
                        stringify!($method),
                        $crate::__descriptor!($($template)?),
                        <$ret as $crate::QueryReturn>::declared_type(),
                    );
                    let arguments: ::std::vec::Vec<::std::string::String> =
                        ::std::vec![$( $crate::render_argument(&$arg) ),*];
                    self.engine.invoke::<$ret>(&signature, arguments).await
                }
            )*
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __column_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $column:literal) => {
        $column
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __descriptor {
    () => {
        ::std::option::Option::None
    };
    ($template:literal) => {
        ::std::option::Option::Some($crate::QueryDescriptor::new($template))
    };
}
